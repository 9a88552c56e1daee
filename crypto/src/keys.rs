//! Ed25519 key generation.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use starreg_types::{KeyPair, PrivateKey, PublicKey};

/// Generate a new Ed25519 key pair from a secure random source.
pub fn generate_keypair() -> KeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    KeyPair {
        public: PublicKey(signing_key.verifying_key().to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    let signing_key = SigningKey::from_bytes(&private.0);
    PublicKey(signing_key.verifying_key().to_bytes())
}

/// Derive a key pair from a 32-byte seed (deterministic; used by tests and tooling).
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let private = PrivateKey(*seed);
    KeyPair {
        public: public_from_private(&private),
        private,
    }
}
