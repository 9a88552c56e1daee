//! Canonical block codec.
//!
//! Defines the exact bytes stored under each block's hash and the exact
//! bytes that are digested. Both are the same JSON document, except that the
//! digested form has `"hash":""`. Field order is fixed by the struct layout:
//! `hash, height, address, time, previousBlockHash, star{ra, dec, mag?, cen?, story}`.
//!
//! The chain index is a JSON array of hex digests.

use serde::{Deserialize, Serialize};
use starreg_types::{BlockHash, Timestamp, WalletAddress};
use thiserror::Error;

use crate::block::{Block, Star};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed block body: {0}")]
    Json(String),

    #[error("story is not valid hex: {0}")]
    StoryHex(String),

    #[error("story is not valid UTF-8")]
    StoryUtf8,

    #[error("invalid digest in block body: {0}")]
    Digest(String),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredBlock {
    hash: String,
    height: u64,
    address: WalletAddress,
    time: Timestamp,
    previous_block_hash: String,
    star: StoredStar,
}

#[derive(Serialize, Deserialize)]
struct StoredStar {
    ra: String,
    dec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cen: Option<String>,
    story: String,
}

fn to_stored(block: &Block, hash: String) -> StoredBlock {
    StoredBlock {
        hash,
        height: block.height,
        address: block.address.clone(),
        time: block.time,
        previous_block_hash: block
            .previous_block_hash
            .map(|h| h.to_hex())
            .unwrap_or_default(),
        star: StoredStar {
            ra: block.star.ra.clone(),
            dec: block.star.dec.clone(),
            mag: block.star.mag.clone(),
            cen: block.star.cen.clone(),
            story: block.star.story_hex(),
        },
    }
}

fn to_json(stored: &StoredBlock) -> Vec<u8> {
    // Plain strings, integers and options only: serialization cannot fail.
    serde_json::to_vec(stored).unwrap_or_default()
}

/// Serialize a block into its stored form.
pub fn encode_block(block: &Block) -> Vec<u8> {
    to_json(&to_stored(block, block.hash.to_hex()))
}

/// The bytes that are digested: the stored form with the hash blanked.
pub fn canonical_bytes(block: &Block) -> Vec<u8> {
    to_json(&to_stored(block, String::new()))
}

/// Digest of the canonical bytes; what `block.hash` must equal.
pub fn compute_hash(block: &Block) -> BlockHash {
    starreg_crypto::hash_block(&canonical_bytes(block))
}

/// Parse a stored block body, hex-decoding the story.
pub fn decode_block(bytes: &[u8]) -> Result<Block, CodecError> {
    let stored: StoredBlock =
        serde_json::from_slice(bytes).map_err(|e| CodecError::Json(e.to_string()))?;
    let hash = stored
        .hash
        .parse()
        .map_err(|_| CodecError::Digest(stored.hash.clone()))?;
    let previous_block_hash = if stored.previous_block_hash.is_empty() {
        None
    } else {
        Some(
            stored
                .previous_block_hash
                .parse()
                .map_err(|_| CodecError::Digest(stored.previous_block_hash.clone()))?,
        )
    };
    let story_bytes =
        hex::decode(&stored.star.story).map_err(|e| CodecError::StoryHex(e.to_string()))?;
    let story = String::from_utf8(story_bytes).map_err(|_| CodecError::StoryUtf8)?;
    Ok(Block {
        hash,
        height: stored.height,
        address: stored.address,
        time: stored.time,
        previous_block_hash,
        star: Star {
            ra: stored.star.ra,
            dec: stored.star.dec,
            mag: stored.star.mag,
            cen: stored.star.cen,
            story,
        },
    })
}

/// Result of reading the persisted chain index.
#[derive(Debug, PartialEq, Eq)]
pub struct DecodedChain {
    pub hashes: Vec<BlockHash>,
    /// The index was not a JSON list and was read as one bare digest.
    pub degraded: bool,
}

pub fn encode_chain(hashes: &[BlockHash]) -> Vec<u8> {
    serde_json::to_vec(hashes).unwrap_or_default()
}

/// Parse the chain index.
///
/// Older stores may hold a single-element index as the bare digest rather
/// than a JSON list; that form is accepted as a one-block chain. `None` if
/// neither form parses.
pub fn decode_chain(bytes: &[u8]) -> Option<DecodedChain> {
    if let Ok(hashes) = serde_json::from_slice::<Vec<BlockHash>>(bytes) {
        return Some(DecodedChain {
            hashes,
            degraded: false,
        });
    }
    let raw = std::str::from_utf8(bytes).ok()?;
    let single: BlockHash = raw.trim().trim_matches('"').parse().ok()?;
    Some(DecodedChain {
        hashes: vec![single],
        degraded: true,
    })
}
