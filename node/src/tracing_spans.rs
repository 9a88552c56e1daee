//! Pre-built [`tracing::Span`] constructors for common registry operations.
//!
//! Using consistent span names and field sets across the codebase makes it
//! easy to filter, search, and correlate traces.

use tracing::{info_span, Span};

/// Span covering a gated ledger write for one address.
pub fn append_span(address: &str) -> Span {
    info_span!("append", address = %address)
}

/// Span covering challenge issuance or signature submission.
pub fn challenge_span(address: &str, step: &str) -> Span {
    info_span!("challenge", address = %address, step = %step)
}

/// Span covering a full-chain integrity scan.
pub fn validate_span() -> Span {
    info_span!("validate_chain")
}

/// Span covering a single HTTP request handled by the RPC server.
pub fn rpc_span(method: &str, path: &str) -> Span {
    info_span!("rpc", method = %method, path = %path)
}
