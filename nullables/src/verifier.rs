//! Nullable verifier: scripted signature checks for testing.

use starreg_crypto::{SignatureVerifier, VerifierError};
use starreg_types::WalletAddress;
use std::collections::HashSet;
use std::sync::Mutex;

/// Accepts exactly the `(address, signature)` pairs it was told about.
///
/// The literal signature `"raise"` makes it fail with
/// `VerifierError::MalformedSignature`, to exercise error capture.
pub struct NullVerifier {
    accepted: Mutex<HashSet<(String, String)>>,
}

impl NullVerifier {
    /// Signature value that makes `verify` return an error.
    pub const RAISE: &'static str = "raise";

    pub fn new() -> Self {
        Self {
            accepted: Mutex::new(HashSet::new()),
        }
    }

    /// Treat `signature` as valid for `address`, whatever the message.
    pub fn accept(&self, address: &str, signature: &str) {
        self.accepted
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert((address.to_string(), signature.to_string()));
    }
}

impl Default for NullVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier for NullVerifier {
    fn verify(
        &self,
        _message: &str,
        address: &WalletAddress,
        signature: &str,
    ) -> Result<bool, VerifierError> {
        if signature == Self::RAISE {
            return Err(VerifierError::MalformedSignature);
        }
        Ok(self
            .accepted
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&(address.to_string(), signature.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_scripted_pairs_pass() {
        let v = NullVerifier::new();
        v.accept("addr1", "good");
        let addr = WalletAddress::new("addr1");
        assert_eq!(v.verify("m", &addr, "good"), Ok(true));
        assert_eq!(v.verify("m", &addr, "bad"), Ok(false));
        assert!(v.verify("m", &addr, NullVerifier::RAISE).is_err());
    }
}
