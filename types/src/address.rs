//! Wallet address type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The identity string a record is attributed to.
///
/// The ledger treats addresses as opaque keys. Whether an address is
/// well-formed is decided by the signature verifier, not here.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// The prefix of addresses derived from Ed25519 public keys.
    pub const PREFIX: &'static str = "star_";

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for WalletAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
