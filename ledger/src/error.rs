use starreg_store::StoreError;
use starreg_types::BlockHash;
use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("block not found: {0}")]
    NotFound(BlockHash),

    #[error("invalid height {height}: chain has {len} blocks")]
    InvalidHeight { height: i64, len: u64 },

    #[error("ledger is not initialized")]
    Uninitialized,

    #[error("malformed persisted state: {0}")]
    MalformedPersistedState(String),

    #[error("block codec: {0}")]
    Codec(#[from] CodecError),
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        Self::StorageUnavailable(e.to_string())
    }
}
