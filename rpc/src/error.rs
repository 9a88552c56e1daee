//! RPC error types and their HTTP mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use starreg_ledger::LedgerError;
use starreg_node::NodeError;
use starreg_verification::VerificationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    NotAuthorized(String),

    #[error("storage unavailable")]
    Unavailable(String),

    #[error("internal error")]
    Internal(String),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotAuthorized(_) => StatusCode::FORBIDDEN,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) | Self::Serve(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        match &self {
            Self::Unavailable(detail) | Self::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
            }
            _ => tracing::debug!(error = %self, "request rejected"),
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for RpcError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<NodeError> for RpcError {
    fn from(e: NodeError) -> Self {
        match e {
            NodeError::NotAuthorized(address) => Self::NotAuthorized(format!(
                "address {address} has no valid signature; request and sign a new validation message"
            )),
            NodeError::Ledger(e) => e.into(),
            NodeError::Verification(VerificationError::StorageUnavailable(detail)) => {
                Self::Unavailable(detail)
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<LedgerError> for RpcError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InvalidHeight { height, len } => {
                Self::NotFound(format!("no block at height {height}; chain has {len} blocks"))
            }
            LedgerError::NotFound(hash) => Self::NotFound(format!("no block with hash {hash}")),
            LedgerError::StorageUnavailable(detail) => Self::Unavailable(detail),
            LedgerError::Uninitialized => Self::Unavailable("ledger is not initialized".into()),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starreg_types::{BlockHash, WalletAddress};

    #[test]
    fn node_errors_map_to_statuses() {
        let cases: Vec<(RpcError, StatusCode)> = vec![
            (
                NodeError::NotAuthorized(WalletAddress::new("a")).into(),
                StatusCode::FORBIDDEN,
            ),
            (
                LedgerError::InvalidHeight { height: -1, len: 1 }.into(),
                StatusCode::NOT_FOUND,
            ),
            (
                LedgerError::NotFound(BlockHash::new([1; 32])).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                LedgerError::StorageUnavailable("down".into()).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                LedgerError::MalformedPersistedState("x".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err:?}");
        }
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = RpcError::Internal("disk path /secret".into());
        assert_eq!(err.to_string(), "internal error");
    }
}
