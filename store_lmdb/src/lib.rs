//! LMDB storage backend for the star registry.
//!
//! Implements [`starreg_store::KeyValueStore`] using the `heed` LMDB bindings.
//! All keys live in one named database inside a single environment; every
//! `put` is its own committed write transaction.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod kv;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use kv::LmdbKvStore;
