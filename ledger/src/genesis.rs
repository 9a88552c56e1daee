//! Genesis block creation: the fixed first block of a new ledger.

use starreg_types::{BlockHash, Timestamp, WalletAddress};

use crate::block::{Block, Star};
use crate::codec::compute_hash;

/// Sentinel owner of the genesis block. Not a valid `star_` address, so no
/// wallet can ever be authorized for it.
pub const GENESIS_ADDRESS: &str = "genesis";

pub const GENESIS_STORY: &str = "First block in the chain - Genesis block";

/// Build the genesis block stamped with `time`.
///
/// Height 0, no predecessor, sentinel address and payload.
pub fn create_genesis_block(time: Timestamp) -> Block {
    let mut block = Block {
        hash: BlockHash::ZERO,
        height: 0,
        address: WalletAddress::new(GENESIS_ADDRESS),
        time,
        previous_block_hash: None,
        star: Star::new("", "", GENESIS_STORY),
    };
    block.hash = compute_hash(&block);
    block
}
