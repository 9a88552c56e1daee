//! HTTP API for the star registry.
//!
//! Provides endpoints for:
//! - Challenge requests and signature submission
//! - Star registration behind the write gate
//! - Block queries by height, hash and owner
//! - Chain integrity, health and Prometheus metrics

pub mod error;
pub mod handlers;
pub mod server;
pub mod validation;

pub use error::RpcError;
pub use handlers::{AppState, BlockView, RecordView, SignatureResponse};
pub use server::RpcServer;
pub use validation::MAX_STORY_BYTES;
