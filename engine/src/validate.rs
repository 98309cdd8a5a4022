//! Input classification and normalization.

use chrono::Datelike;
use lazy_static::lazy_static;
use regex::Regex;
use sha3::{Digest, Keccak256};

use crate::error::{EngineError, Result};

lazy_static! {
    // Kenyan mobile numbers: 07xx, 01[01]x, with or without the country code.
    static ref PHONE_RE: Regex =
        Regex::new(r"^(?:\+254|254|0)?(7\d{8}|1[01]\d{7})$").expect("phone regex");
    static ref ADDRESS_RE: Regex = Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("address regex");
    static ref ALIAS_RE: Regex =
        Regex::new(r"^[a-zA-Z][a-zA-Z0-9]*(?:\.[a-zA-Z0-9]+)*$").expect("alias regex");
}

/// What a recipient entry looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    Phone,
    Address,
    Alias,
}

/// Remove every whitespace character (`"0712 345 678" -> "0712345678"`).
pub fn normalize_whitespace(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn classify_recipient(input: &str) -> Option<RecipientKind> {
    if PHONE_RE.is_match(input) {
        Some(RecipientKind::Phone)
    } else if ADDRESS_RE.is_match(input) {
        Some(RecipientKind::Address)
    } else if ALIAS_RE.is_match(input) {
        Some(RecipientKind::Alias)
    } else {
        None
    }
}

pub fn is_valid_phone(input: &str) -> bool {
    PHONE_RE.is_match(input)
}

/// Canonical `+254...` form of a phone number.
pub fn format_phone_number(input: &str) -> Result<String> {
    let caps = PHONE_RE
        .captures(input)
        .ok_or_else(|| EngineError::Data(format!("not a phone number: {input:?}")))?;
    Ok(format!("+254{}", &caps[1]))
}

/// Lowercase hex without `0x`; the key form for reverse lookups.
pub fn normalize_hex(address: &str) -> String {
    let stripped = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    stripped.to_ascii_lowercase()
}

/// EIP-55 mixed-case checksum encoding of an address.
///
/// # Errors
///
/// Returns `EngineError::Data` if `address` is not 20 bytes of hex.
pub fn checksum_address(address: &str) -> Result<String> {
    let lower = normalize_hex(address);
    if lower.len() != 40 || hex::decode(&lower).is_err() {
        return Err(EngineError::Data(format!("not an address: {address:?}")));
    }
    let digest = Keccak256::digest(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = digest[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Four-digit year between 1900 and the current year.
pub fn is_valid_yob(input: &str) -> bool {
    is_valid_yob_at(input, chrono::Utc::now().year())
}

fn is_valid_yob_at(input: &str, current_year: i32) -> bool {
    if input.len() != 4 || !input.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    input
        .parse::<i32>()
        .map(|y| (1900..=current_year).contains(&y))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_recipient() {
        assert_eq!(classify_recipient("0712345678"), Some(RecipientKind::Phone));
        assert_eq!(classify_recipient("+254712345678"), Some(RecipientKind::Phone));
        assert_eq!(classify_recipient("0112345678"), Some(RecipientKind::Phone));
        assert_eq!(
            classify_recipient("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            Some(RecipientKind::Address)
        );
        assert_eq!(classify_recipient("amina"), Some(RecipientKind::Alias));
        assert_eq!(classify_recipient("amina.sarafu.eth"), Some(RecipientKind::Alias));
        assert_eq!(classify_recipient("07123"), None);
        assert_eq!(classify_recipient("0x123"), None);
        assert_eq!(classify_recipient("bad alias!"), None);
    }

    #[test]
    fn test_format_phone_number() {
        assert_eq!(format_phone_number("0712345678").unwrap(), "+254712345678");
        assert_eq!(format_phone_number("254712345678").unwrap(), "+254712345678");
        assert_eq!(format_phone_number("+254112345678").unwrap(), "+254112345678");
        assert!(format_phone_number("12345").is_err());
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace(" 0712 345\t678 "), "0712345678");
    }

    #[test]
    fn test_checksum_address_eip55_vectors() {
        for addr in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            assert_eq!(checksum_address(&addr.to_lowercase()).unwrap(), addr);
        }
        assert!(checksum_address("0x1234").is_err());
    }

    #[test]
    fn test_normalize_hex() {
        assert_eq!(normalize_hex("0xABCdef"), "abcdef");
        assert_eq!(normalize_hex("0XABC"), "abc");
        assert_eq!(normalize_hex("abc"), "abc");
    }

    #[test]
    fn test_yob_range() {
        assert!(is_valid_yob_at("1990", 2026));
        assert!(is_valid_yob_at("1900", 2026));
        assert!(is_valid_yob_at("2026", 2026));
        assert!(!is_valid_yob_at("2027", 2026));
        assert!(!is_valid_yob_at("1899", 2026));
        assert!(!is_valid_yob_at("90", 2026));
        assert!(!is_valid_yob_at("19a0", 2026));
        assert!(is_valid_yob("1985"));
    }
}
