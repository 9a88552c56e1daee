use starreg_types::WalletAddress;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] starreg_ledger::LedgerError),

    #[error("verification error: {0}")]
    Verification(#[from] starreg_verification::VerificationError),

    #[error("storage error: {0}")]
    Lmdb(#[from] starreg_store_lmdb::LmdbError),

    /// The address holds no valid, unused authorization.
    #[error("address {0} is not authorized to register a star")]
    NotAuthorized(WalletAddress),

    #[error("config error: {0}")]
    Config(String),

    #[error("logging error: {0}")]
    Logging(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
