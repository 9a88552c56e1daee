//! Chain integrity report.

use serde::Serialize;

/// Why a height failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    /// The recomputed digest differs from the stored one.
    HashMismatch,
    /// This block's hash is not the successor's `previousBlockHash`.
    BrokenLink,
    /// The genesis block names a predecessor.
    GenesisHasParent,
    /// The stored `height` field disagrees with the block's index position.
    HeightMismatch,
    /// The body referenced by the index is missing or undecodable.
    Unreadable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChainDefect {
    pub height: u64,
    pub kind: DefectKind,
}

/// Every defect found by a full scan. Empty means the chain is intact.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub blocks_checked: u64,
    pub defects: Vec<ChainDefect>,
}

impl ChainReport {
    pub fn is_valid(&self) -> bool {
        self.defects.is_empty()
    }

    pub(crate) fn push(&mut self, height: u64, kind: DefectKind) {
        self.defects.push(ChainDefect { height, kind });
    }

    /// Distinct failing heights in ascending order.
    pub fn defective_heights(&self) -> Vec<u64> {
        let mut heights: Vec<u64> = self.defects.iter().map(|d| d.height).collect();
        heights.sort_unstable();
        heights.dedup();
        heights
    }
}
