//! Nullable infrastructure for deterministic testing.
//!
//! All external dependencies (clock, storage, signature verification) are
//! abstracted behind traits. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod store;
pub mod verifier;

pub use clock::NullClock;
pub use store::NullStore;
pub use verifier::NullVerifier;
