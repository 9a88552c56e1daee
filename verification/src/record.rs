//! One outstanding proof-of-possession challenge.

use serde::{Deserialize, Serialize};
use starreg_types::{Timestamp, WalletAddress};

/// Challenge issued to `address`, plus the result of the last signature
/// submitted against it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub address: WalletAddress,
    #[serde(rename = "requestTimeStamp", alias = "requestTimestamp")]
    pub request_timestamp: Timestamp,
    /// `"<address>:<requestTimestamp>:<tag>"`, the exact text to sign.
    pub message: String,
    /// Window length in milliseconds.
    #[serde(rename = "validationWindow", alias = "validationWindowMs")]
    pub validation_window_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// `None` until a signature is submitted.
    #[serde(default)]
    pub signature_valid: Option<bool>,
}

/// Where a record sits in the per-address write-gate lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordState {
    Issued,
    SignedValid,
    SignedInvalid,
    Expired,
}

/// Build the message a wallet must sign for a challenge.
pub fn challenge_message(address: &WalletAddress, timestamp: Timestamp, tag: &str) -> String {
    format!("{}:{}:{}", address, timestamp, tag)
}

impl VerificationRecord {
    /// A fresh, unsigned challenge.
    pub fn issue(address: WalletAddress, now: Timestamp, window_ms: u64, tag: &str) -> Self {
        Self {
            message: challenge_message(&address, now, tag),
            address,
            request_timestamp: now,
            validation_window_ms: window_ms,
            signature: None,
            signature_valid: None,
        }
    }

    /// Milliseconds left in the window; negative once expired.
    pub fn remaining_window_ms(&self, now: Timestamp) -> i64 {
        self.request_timestamp
            .remaining_ms(self.validation_window_ms, now)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.remaining_window_ms(now) < 0
    }

    /// Signed results stick: an expired window only matters for a record
    /// that was never signed.
    pub fn state(&self, now: Timestamp) -> RecordState {
        match self.signature_valid {
            Some(true) => RecordState::SignedValid,
            Some(false) => RecordState::SignedInvalid,
            None if self.is_expired(now) => RecordState::Expired,
            None => RecordState::Issued,
        }
    }
}
