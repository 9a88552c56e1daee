//! Block: one committed star record.

use serde::{Deserialize, Serialize};
use starreg_types::{BlockHash, Timestamp, WalletAddress};

/// Celestial coordinates plus the owner's story.
///
/// `story` holds the decoded text; the codec hex-encodes it at rest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Star {
    /// Right ascension.
    pub ra: String,
    /// Declination.
    pub dec: String,
    /// Magnitude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mag: Option<String>,
    /// Constellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cen: Option<String>,
    pub story: String,
}

impl Star {
    pub fn new(ra: impl Into<String>, dec: impl Into<String>, story: impl Into<String>) -> Self {
        Self {
            ra: ra.into(),
            dec: dec.into(),
            mag: None,
            cen: None,
            story: story.into(),
        }
    }

    /// The story as stored and hashed: lowercase hex of its bytes.
    pub fn story_hex(&self) -> String {
        hex::encode(self.story.as_bytes())
    }
}

/// What a caller submits: everything else is assigned by the ledger on append.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockCandidate {
    pub address: WalletAddress,
    pub star: Star,
}

/// A committed block.
///
/// All fields are immutable once appended. `hash` is the digest of the
/// block's canonical bytes with the hash field blanked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub hash: BlockHash,
    /// Index in the chain; genesis is 0.
    pub height: u64,
    pub address: WalletAddress,
    /// Server-assigned creation time.
    pub time: Timestamp,
    /// `None` only for the genesis block.
    pub previous_block_hash: Option<BlockHash>,
    pub star: Star,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.height == 0 && self.previous_block_hash.is_none()
    }
}
