//! Block digest type for the hash-chained ledger.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A 32-byte block digest. Identifies a block body in the store and links
/// each block to its predecessor.
///
/// On the wire and in the store it is a 64-character lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    /// Placeholder for a digest not yet computed.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form, also used as the block's store key.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash(")?;
        for b in &self.0[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "\u{2026})")
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for BlockHash {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bytes = hex::decode(trimmed).map_err(|_| TypesError::InvalidHash(s.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TypesError::InvalidHash(s.to_string()))?;
        Ok(Self(arr))
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_full_hex() {
        let h = BlockHash::new([0xab; 32]);
        assert_eq!(h.to_string().len(), 64);
        assert!(h.to_string().starts_with("abab"));
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!("abcd".parse::<BlockHash>().is_err());
        assert!("".parse::<BlockHash>().is_err());
    }

    #[test]
    fn parse_rejects_non_hex() {
        let s = "zz".repeat(32);
        assert!(s.parse::<BlockHash>().is_err());
    }

    #[test]
    fn json_form_is_hex_string() {
        let h = BlockHash::new([1u8; 32]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        let back: BlockHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
