//! Request payload checks. The ledger accepts any payload; everything a
//! client can get wrong is rejected here with a 400.

use starreg_ledger::Star;
use starreg_types::{BlockHash, WalletAddress};

use crate::error::RpcError;
use crate::handlers::StarRequest;

/// Longest story accepted, in bytes.
pub const MAX_STORY_BYTES: usize = 500;

/// Longest address accepted, in characters.
pub const MAX_ADDRESS_LEN: usize = 128;

pub fn parse_address(raw: &str) -> Result<WalletAddress, RpcError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RpcError::InvalidRequest("address is required".into()));
    }
    if trimmed.len() > MAX_ADDRESS_LEN {
        return Err(RpcError::InvalidRequest("address is too long".into()));
    }
    // ':' separates the fields of the challenge message.
    if trimmed.contains(':') || trimmed.chars().any(char::is_whitespace) {
        return Err(RpcError::InvalidRequest(
            "address must not contain ':' or whitespace".into(),
        ));
    }
    Ok(WalletAddress::new(trimmed))
}

pub fn parse_height(raw: &str) -> Result<i64, RpcError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| RpcError::InvalidRequest(format!("invalid height: {raw}")))
}

pub fn parse_hash(raw: &str) -> Result<BlockHash, RpcError> {
    raw.parse()
        .map_err(|_| RpcError::InvalidRequest(format!("invalid block hash: {raw}")))
}

pub fn validate_star(star: StarRequest) -> Result<Star, RpcError> {
    let ra = required(star.ra, "star.ra")?;
    let dec = required(star.dec, "star.dec")?;
    let story = required(star.story, "star.story")?;
    if !story.is_ascii() {
        return Err(RpcError::InvalidRequest(
            "star.story must be ASCII text".into(),
        ));
    }
    if story.len() > MAX_STORY_BYTES {
        return Err(RpcError::InvalidRequest(format!(
            "star.story is limited to {MAX_STORY_BYTES} bytes"
        )));
    }
    Ok(Star {
        ra,
        dec,
        mag: optional(star.mag),
        cen: optional(star.cen),
        story,
    })
}

fn required(value: Option<String>, field: &str) -> Result<String, RpcError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(RpcError::InvalidRequest(format!("{field} is required"))),
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(story: &str) -> StarRequest {
        StarRequest {
            ra: Some("16h 29m 1.0s".into()),
            dec: Some("-26° 29' 24.9".into()),
            mag: Some(String::new()),
            cen: None,
            story: Some(story.into()),
        }
    }

    #[test]
    fn accepts_minimal_star() {
        let star = validate_star(request("hello")).unwrap();
        assert_eq!(star.story, "hello");
        assert_eq!(star.mag, None);
    }

    #[test]
    fn story_limits() {
        assert!(validate_star(request(&"a".repeat(MAX_STORY_BYTES))).is_ok());
        assert!(validate_star(request(&"a".repeat(MAX_STORY_BYTES + 1))).is_err());
        assert!(validate_star(request("héllo")).is_err());
        assert!(validate_star(request("  ")).is_err());
    }

    #[test]
    fn coordinates_are_required() {
        let mut req = request("s");
        req.dec = None;
        assert!(matches!(
            validate_star(req),
            Err(RpcError::InvalidRequest(msg)) if msg.contains("star.dec")
        ));
    }

    #[test]
    fn address_rules() {
        assert_eq!(parse_address(" addr1 ").unwrap().as_str(), "addr1");
        assert!(parse_address("").is_err());
        assert!(parse_address("a:b").is_err());
        assert!(parse_address(&"a".repeat(MAX_ADDRESS_LEN + 1)).is_err());
    }

    #[test]
    fn height_must_be_integer() {
        assert_eq!(parse_height("3").unwrap(), 3);
        assert_eq!(parse_height("-1").unwrap(), -1);
        assert!(parse_height("1.5").is_err());
        assert!(parse_height("abc").is_err());
    }
}
