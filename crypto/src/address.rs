//! Address derivation from Ed25519 public keys.
//!
//! Format: `star_` + base32(public key, 52 chars) + base32(checksum, 8 chars).
//! The checksum is the first 5 bytes of Blake2b-256(public key). The
//! alphabet `13456789abcdefghijkmnopqrstuwxyz` leaves out look-alike characters.

use starreg_types::{PublicKey, WalletAddress};

const ALPHABET: &[u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";
const PREFIX: &str = WalletAddress::PREFIX;
const KEY_CHARS: usize = 52;
const CHECKSUM_CHARS: usize = 8;
const CHECKSUM_BYTES: usize = 5;

fn symbol_value(c: u8) -> Option<u8> {
    ALPHABET.iter().position(|&a| a == c).map(|p| p as u8)
}

fn encode_base32(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for &byte in bytes {
        acc = (acc << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((acc >> bits) & 0x1F) as usize] as char);
        }
        acc &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(ALPHABET[((acc << (5 - bits)) & 0x1F) as usize] as char);
    }
    out
}

/// Decode into exactly `N` bytes; trailing pad bits are dropped.
fn decode_base32<const N: usize>(s: &str) -> Option<[u8; N]> {
    let mut out = [0u8; N];
    let mut pos = 0;
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for c in s.bytes() {
        acc = (acc << 5) | symbol_value(c)? as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            if pos < N {
                out[pos] = (acc >> bits) as u8;
                pos += 1;
            }
        }
        acc &= (1 << bits) - 1;
    }
    (pos == N).then_some(out)
}

/// Derive the `star_` address that owns `public_key`.
pub fn derive_address(public_key: &PublicKey) -> WalletAddress {
    let checksum = crate::blake2b_256(public_key.as_bytes());
    WalletAddress::new(format!(
        "{}{}{}",
        PREFIX,
        encode_base32(public_key.as_bytes()),
        encode_base32(&checksum[..CHECKSUM_BYTES])
    ))
}

/// Extract the public key bytes from an address.
///
/// `None` if the prefix, length, alphabet or checksum is wrong.
pub fn decode_address(address: &str) -> Option<[u8; 32]> {
    let encoded = address.strip_prefix(PREFIX)?;
    if encoded.len() != KEY_CHARS + CHECKSUM_CHARS || !encoded.is_ascii() {
        return None;
    }
    let (key_part, checksum_part) = encoded.split_at(KEY_CHARS);
    let key: [u8; 32] = decode_base32(key_part)?;
    let checksum: [u8; CHECKSUM_BYTES] = decode_base32(checksum_part)?;
    (checksum[..] == crate::blake2b_256(&key)[..CHECKSUM_BYTES]).then_some(key)
}

/// Whether an address string is well-formed with a correct checksum.
pub fn validate_address(address: &str) -> bool {
    decode_address(address).is_some()
}
