//! Abstract storage contract for the star registry.
//!
//! Every storage backend (LMDB, in-memory for testing) implements
//! [`KeyValueStore`]. The ledger and the verification queue depend only on
//! the trait and each own their keys exclusively.

pub mod error;
pub mod kv;

pub use error::StoreError;
pub use kv::KeyValueStore;

/// Key of the serialized ordered list of block hashes (the chain index).
pub const CHAIN_KEY: &str = "chain";

/// Key of the serialized list of verification records.
pub const QUEUE_KEY: &str = "queue";
