//! Proof-of-possession verifier: did the owner of `address` sign `message`?

use starreg_types::{PublicKey, Signature, WalletAddress};
use thiserror::Error;

use crate::{decode_address, verify_signature};

/// Raised when the inputs cannot be verified at all, as opposed to a
/// well-formed signature that simply does not match.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifierError {
    #[error("malformed address: {0}")]
    MalformedAddress(String),

    #[error("malformed signature: expected 128 hex characters")]
    MalformedSignature,
}

/// Pluggable signature check used by the verification queue.
pub trait SignatureVerifier: Send + Sync {
    fn verify(
        &self,
        message: &str,
        address: &WalletAddress,
        signature: &str,
    ) -> Result<bool, VerifierError>;
}

/// Verifies hex Ed25519 signatures against the key embedded in a `star_` address.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(
        &self,
        message: &str,
        address: &WalletAddress,
        signature: &str,
    ) -> Result<bool, VerifierError> {
        let key = decode_address(address.as_str())
            .ok_or_else(|| VerifierError::MalformedAddress(address.to_string()))?;
        let sig = Signature::from_hex(signature).ok_or(VerifierError::MalformedSignature)?;
        Ok(verify_signature(message.as_bytes(), &sig, &PublicKey(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{derive_address, keypair_from_seed, sign_message};

    #[test]
    fn accepts_owner_signature() {
        let kp = keypair_from_seed(&[3u8; 32]);
        let addr = derive_address(&kp.public);
        let msg = format!("{}:1700000000000:starRegistry", addr);
        let sig = sign_message(msg.as_bytes(), &kp.private).to_hex();
        assert_eq!(Ed25519Verifier.verify(&msg, &addr, &sig), Ok(true));
    }

    #[test]
    fn rejects_other_key() {
        let owner = keypair_from_seed(&[3u8; 32]);
        let other = keypair_from_seed(&[4u8; 32]);
        let addr = derive_address(&owner.public);
        let sig = sign_message(b"m", &other.private).to_hex();
        assert_eq!(Ed25519Verifier.verify("m", &addr, &sig), Ok(false));
    }

    #[test]
    fn malformed_inputs_raise() {
        let kp = keypair_from_seed(&[3u8; 32]);
        let addr = derive_address(&kp.public);
        assert_eq!(
            Ed25519Verifier.verify("m", &addr, "not-hex"),
            Err(VerifierError::MalformedSignature)
        );
        let bogus = WalletAddress::new("1HZwkjkeaoZfTSaJxDw6aKkxp45agDiEzN");
        let sig = sign_message(b"m", &kp.private).to_hex();
        assert!(matches!(
            Ed25519Verifier.verify("m", &bogus, &sig),
            Err(VerifierError::MalformedAddress(_))
        ));
    }
}
