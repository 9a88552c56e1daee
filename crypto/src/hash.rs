//! Blake2b hashing for block digests.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use starreg_types::BlockHash;

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Digest a block's canonical bytes into its `BlockHash`.
pub fn hash_block(canonical_bytes: &[u8]) -> BlockHash {
    BlockHash::new(blake2b_256(canonical_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_deterministic() {
        assert_eq!(blake2b_256(b"hello star"), blake2b_256(b"hello star"));
    }

    #[test]
    fn blake2b_different_inputs() {
        assert_ne!(blake2b_256(b"hello"), blake2b_256(b"world"));
    }

    #[test]
    fn blake2b_multi_equivalent() {
        let single = blake2b_256(b"helloworld");
        let multi = blake2b_256_multi(&[b"hello", b"world"]);
        assert_eq!(single, multi);
    }

    #[test]
    fn hash_block_hex_is_64_chars() {
        let h = hash_block(b"{\"hash\":\"\",\"height\":0}");
        assert_eq!(h.to_hex().len(), 64);
    }
}
