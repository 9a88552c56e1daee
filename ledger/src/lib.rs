//! Hash-chained ledger of registered stars.
//!
//! Blocks are content-addressed by their Blake2b-256 digest and linked to
//! their predecessor. A single ordered index of hashes is the authoritative
//! record of what is committed; the chain only grows.

pub mod block;
pub mod chain;
pub mod codec;
pub mod error;
pub mod genesis;
pub mod validation;

pub use block::{Block, BlockCandidate, Star};
pub use chain::{Ledger, LedgerSummary};
pub use codec::{compute_hash, decode_block, decode_chain, encode_block, encode_chain, CodecError};
pub use error::LedgerError;
pub use genesis::{create_genesis_block, GENESIS_ADDRESS, GENESIS_STORY};
pub use validation::{ChainDefect, ChainReport, DefectKind};
