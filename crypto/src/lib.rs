//! Cryptographic primitives for the star registry.
//!
//! - **Blake2b-256** is the block digest: `digest(bytes) -> 32 bytes`, shown as hex
//! - **Ed25519** signs and verifies challenge messages
//! - Addresses are `star_` + base32(public key) + base32(checksum)
//! - [`SignatureVerifier`] is the seam the verification queue calls through

pub mod address;
pub mod hash;
pub mod keys;
pub mod sign;
pub mod verifier;

pub use address::{decode_address, derive_address, validate_address};
pub use hash::{blake2b_256, blake2b_256_multi, hash_block};
pub use keys::{generate_keypair, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
pub use verifier::{Ed25519Verifier, SignatureVerifier, VerifierError};
