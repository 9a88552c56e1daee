//! RPC request handlers and the JSON views they return.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use starreg_ledger::{Block, ChainDefect, ChainReport};
use starreg_node::{NodeError, StarRegistry};
use starreg_types::{BlockHash, Timestamp, WalletAddress};
use starreg_verification::{SubmissionReport, VerificationRecord};

use crate::error::RpcError;
use crate::validation::{parse_address, parse_hash, parse_height, validate_star};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<StarRegistry>,
}

/// Run a registry call on the blocking pool; LMDB reads and writes are
/// synchronous.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, RpcError>
where
    F: FnOnce(&StarRegistry) -> Result<T, NodeError> + Send + 'static,
    T: Send + 'static,
{
    let registry = state.registry.clone();
    tokio::task::spawn_blocking(move || f(&registry))
        .await
        .map_err(|e| RpcError::Internal(e.to_string()))?
        .map_err(RpcError::from)
}

// ── Requests ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RequestValidationRequest {
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct SignatureRequest {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub signature: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StarRequest {
    pub ra: Option<String>,
    pub dec: Option<String>,
    pub mag: Option<String>,
    pub cen: Option<String>,
    pub story: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterStarRequest {
    #[serde(default)]
    pub address: String,
    pub star: Option<StarRequest>,
}

// ── Views ────────────────────────────────────────────────────────────────

/// Public view of a challenge. `validation_window` is what is left of the
/// window, negative once it has elapsed.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    pub address: WalletAddress,
    pub request_time_stamp: Timestamp,
    pub message: String,
    pub validation_window: i64,
}

impl RecordView {
    fn new(record: &VerificationRecord, remaining_ms: i64) -> Self {
        Self {
            address: record.address.clone(),
            request_time_stamp: record.request_timestamp,
            message: record.message.clone(),
            validation_window: remaining_ms,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    #[serde(flatten)]
    pub record: RecordView,
    /// `"valid"` or `"invalid"`.
    pub message_signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureResponse {
    pub register_star: bool,
    pub status: SignatureStatus,
    pub errors: Vec<String>,
}

impl SignatureResponse {
    fn new(report: &SubmissionReport, remaining_ms: i64) -> Self {
        let valid = report.is_valid();
        Self {
            register_star: valid,
            status: SignatureStatus {
                record: RecordView::new(&report.record, remaining_ms),
                message_signature: if valid { "valid" } else { "invalid" }.to_string(),
            },
            errors: report.issues.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarView {
    pub ra: String,
    pub dec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cen: Option<String>,
    /// Hex of the story bytes, as hashed.
    pub story: String,
    pub story_decoded: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BodyView {
    pub address: WalletAddress,
    pub star: StarView,
}

/// Wire form of a block. The genesis block has an empty `previousBlockHash`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockView {
    pub hash: BlockHash,
    pub height: u64,
    pub body: BodyView,
    pub time: Timestamp,
    pub previous_block_hash: String,
}

impl From<Block> for BlockView {
    fn from(block: Block) -> Self {
        let story = block.star.story_hex();
        Self {
            hash: block.hash,
            height: block.height,
            body: BodyView {
                address: block.address,
                star: StarView {
                    ra: block.star.ra,
                    dec: block.star.dec,
                    mag: block.star.mag,
                    cen: block.star.cen,
                    story,
                    story_decoded: block.star.story,
                },
            },
            time: block.time,
            previous_block_hash: block
                .previous_block_hash
                .map(|h| h.to_hex())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainValidationResponse {
    pub valid: bool,
    pub blocks_checked: u64,
    pub defects: Vec<ChainDefect>,
}

impl From<ChainReport> for ChainValidationResponse {
    fn from(report: ChainReport) -> Self {
        Self {
            valid: report.is_valid(),
            blocks_checked: report.blocks_checked,
            defects: report.defects,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HeightResponse {
    pub height: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub height: u64,
}

// ── Handlers ─────────────────────────────────────────────────────────────

/// `POST /requestValidation`
pub async fn request_validation(
    State(state): State<AppState>,
    payload: Result<Json<RequestValidationRequest>, JsonRejection>,
) -> Result<Json<RecordView>, RpcError> {
    let Json(req) = payload?;
    let address = parse_address(&req.address)?;
    let view = blocking(&state, move |registry| {
        let record = registry.request_validation(&address)?;
        Ok(RecordView::new(&record, registry.remaining_window_ms(&record)))
    })
    .await?;
    Ok(Json(view))
}

/// `POST /message-signature/validate`
pub async fn validate_signature(
    State(state): State<AppState>,
    payload: Result<Json<SignatureRequest>, JsonRejection>,
) -> Result<Json<SignatureResponse>, RpcError> {
    let Json(req) = payload?;
    let address = parse_address(&req.address)?;
    if req.signature.trim().is_empty() {
        return Err(RpcError::InvalidRequest("signature is required".into()));
    }
    let lookup = address.clone();
    let response = blocking(&state, move |registry| {
        let report = registry.validate_signature(&address, req.signature.trim())?;
        Ok(report.map(|r| SignatureResponse::new(&r, registry.remaining_window_ms(&r.record))))
    })
    .await?;
    response.map(Json).ok_or_else(|| {
        RpcError::NotFound(format!(
            "no validation request for {lookup}; call /requestValidation first"
        ))
    })
}

/// `POST /block`
pub async fn register_star(
    State(state): State<AppState>,
    payload: Result<Json<RegisterStarRequest>, JsonRejection>,
) -> Result<Json<BlockView>, RpcError> {
    let Json(req) = payload?;
    let address = parse_address(&req.address)?;
    let star = validate_star(
        req.star
            .ok_or_else(|| RpcError::InvalidRequest("star is required".into()))?,
    )?;
    let block = blocking(&state, move |registry| registry.register_star(address, star)).await?;
    Ok(Json(block.into()))
}

/// `GET /block/:height`
pub async fn block_by_height(
    State(state): State<AppState>,
    Path(height): Path<String>,
) -> Result<Json<BlockView>, RpcError> {
    let height = parse_height(&height)?;
    let block = blocking(&state, move |registry| registry.block_by_height(height)).await?;
    Ok(Json(block.into()))
}

/// `GET /stars/hash/:hash`
pub async fn block_by_hash(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<BlockView>, RpcError> {
    let hash = parse_hash(&hash)?;
    let block = blocking(&state, move |registry| registry.block_by_hash(&hash)).await?;
    Ok(Json(block.into()))
}

/// `GET /stars/address/:address`
pub async fn blocks_by_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<BlockView>>, RpcError> {
    let address = parse_address(&address)?;
    let blocks = blocking(&state, move |registry| registry.blocks_by_address(&address)).await?;
    Ok(Json(blocks.into_iter().map(BlockView::from).collect()))
}

/// `GET /chain/height`
pub async fn chain_height(
    State(state): State<AppState>,
) -> Result<Json<HeightResponse>, RpcError> {
    let height = blocking(&state, |registry| registry.height()).await?;
    Ok(Json(HeightResponse { height }))
}

/// `GET /chain/validate`
pub async fn validate_chain(
    State(state): State<AppState>,
) -> Result<Json<ChainValidationResponse>, RpcError> {
    let report = blocking(&state, |registry| registry.validate_chain()).await?;
    Ok(Json(report.into()))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, RpcError> {
    let height = blocking(&state, |registry| registry.height()).await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        height,
    }))
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, RpcError> {
    let text = state.registry.metrics().encode_text()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    ))
}
