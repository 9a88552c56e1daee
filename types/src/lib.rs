//! Fundamental types for the star registry ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! addresses, block digests, timestamps, the clock seam, and key material.

pub mod address;
pub mod block;
pub mod error;
pub mod keys;
pub mod time;

pub use address::WalletAddress;
pub use block::BlockHash;
pub use error::TypesError;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use time::{Clock, SystemClock, Timestamp};
