use starreg_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<StoreError> for VerificationError {
    fn from(e: StoreError) -> Self {
        Self::StorageUnavailable(e.to_string())
    }
}
