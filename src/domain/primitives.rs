//! Domain primitives: Address, TxHash, PoolId, ChainId, Timestamp.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Block time in seconds since Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn new(secs: i64) -> Self {
        Timestamp(secs)
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    pub fn plus_secs(&self, secs: i64) -> Self {
        Timestamp(self.0.saturating_add(secs))
    }

    /// Absolute distance in seconds.
    pub fn abs_diff(&self, other: Timestamp) -> u64 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// EVM chain id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    #[error("expected 0x-prefixed hex, got {0}")]
    MissingPrefix(String),
    #[error("invalid hex in {0}")]
    InvalidHex(String),
    #[error("expected {expected} bytes, got {actual} in {value}")]
    WrongLength {
        expected: usize,
        actual: usize,
        value: String,
    },
}

fn normalize_hex(s: &str, expected_bytes: Option<usize>) -> Result<String, AddressParseError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| AddressParseError::MissingPrefix(s.to_string()))?;

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AddressParseError::InvalidHex(s.to_string()));
    }

    if let Some(expected) = expected_bytes {
        if digits.len() != expected * 2 {
            return Err(AddressParseError::WrongLength {
                expected,
                actual: digits.len() / 2,
                value: s.to_string(),
            });
        }
    }

    Ok(format!("0x{}", digits.to_ascii_lowercase()))
}

/// Chain address, always stored lowercase so the same account resolves to one id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Address(String);

impl Address {
    pub const ZERO_HEX: &'static str = "0x0000000000000000000000000000000000000000";

    /// Build an address from any casing; no length validation.
    pub fn new(addr: impl AsRef<str>) -> Self {
        Address(addr.as_ref().trim().to_ascii_lowercase())
    }

    pub fn zero() -> Self {
        Address(Self::ZERO_HEX.to_string())
    }

    pub fn is_zero(&self) -> bool {
        let digits = self.0.trim_start_matches("0x");
        !digits.is_empty() && digits.chars().all(|c| c == '0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address bytes without the `0x` prefix.
    pub fn hex_digits(&self) -> &str {
        self.0.trim_start_matches("0x")
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_hex(s, Some(20)).map(Address)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Address::new(raw))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction hash (lowercase hex).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl AsRef<str>) -> Self {
        TxHash(hash.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TxHash::new(raw))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lending pool identifier (bytes32, lowercase hex).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PoolId(String);

impl PoolId {
    pub fn new(id: impl AsRef<str>) -> Self {
        PoolId(id.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Left-padded 32-byte ABI word for `eth_call` encoding.
    pub fn to_abi_word(&self) -> Result<[u8; 32], AddressParseError> {
        let digits = self.0.trim_start_matches("0x");
        let bytes = hex::decode(digits).map_err(|_| AddressParseError::InvalidHex(self.0.clone()))?;
        if bytes.len() > 32 {
            return Err(AddressParseError::WrongLength {
                expected: 32,
                actual: bytes.len(),
                value: self.0.clone(),
            });
        }
        let mut word = [0u8; 32];
        word[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(word)
    }
}

impl<'de> Deserialize<'de> for PoolId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(PoolId::new(raw))
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_is_lowercased() {
        let addr = Address::new("0xABCDEF0000000000000000000000000000000001");
        assert_eq!(addr.as_str(), "0xabcdef0000000000000000000000000000000001");
    }

    #[test]
    fn test_address_from_str_validates_length() {
        assert!(Address::from_str("0x1234").is_err());
        assert!(Address::from_str("1234567890123456789012345678901234567890").is_err());
        assert!(Address::from_str("0x000000000000000000000000000000000000dEaD").is_ok());
    }

    #[test]
    fn test_zero_address_detection() {
        assert!(Address::zero().is_zero());
        assert!(Address::new("0x0").is_zero());
        assert!(!Address::new("0x01").is_zero());
    }

    #[test]
    fn test_address_deserialize_normalizes() {
        let addr: Address = serde_json::from_str("\"0xAbC\"").unwrap();
        assert_eq!(addr.as_str(), "0xabc");
    }

    #[test]
    fn test_pool_id_abi_word_left_pads() {
        let id = PoolId::new("0x01ff");
        let word = id.to_abi_word().unwrap();
        assert_eq!(word[30], 0x01);
        assert_eq!(word[31], 0xff);
        assert!(word[..30].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_timestamp_abs_diff() {
        assert_eq!(Timestamp::new(100).abs_diff(Timestamp::new(40)), 60);
        assert_eq!(Timestamp::new(40).abs_diff(Timestamp::new(100)), 60);
    }
}
