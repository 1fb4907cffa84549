//! Unsigned 256-bit amount type backed by alloy's `U256`.
//!
//! On-chain values (assets, shares, rates) routinely exceed 64 bits, so every
//! quantity flowing through the projector uses this wrapper. It serializes as a
//! canonical base-10 string so stored JSON stays lossless and readable.

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Lossless unsigned integer for on-chain quantities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(U256);

/// Error returned when a string is not a valid unsigned 256-bit integer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid amount: {0}")]
pub struct AmountParseError(pub String);

/// Result of a decrement that would have gone below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Underflow {
    pub current: Amount,
    pub requested: Amount,
}

impl Amount {
    pub const ZERO: Amount = Amount(U256::ZERO);

    /// Basis-point denominator (100% == 10_000).
    pub const BPS_DENOMINATOR: u64 = 10_000;

    pub fn new(value: U256) -> Self {
        Amount(value)
    }

    pub fn from_u64(value: u64) -> Self {
        Amount(U256::from(value))
    }

    /// Parse from a base-10 string, or a `0x`-prefixed hex string.
    pub fn parse(s: &str) -> Result<Self, AmountParseError> {
        let trimmed = s.trim();
        let parsed = match trimmed.strip_prefix("0x") {
            Some(hex_digits) if !hex_digits.is_empty() => U256::from_str_radix(hex_digits, 16),
            _ => U256::from_str_radix(trimmed, 10),
        };
        parsed
            .map(Amount)
            .map_err(|_| AmountParseError(s.to_string()))
    }

    /// Decode a big-endian 32-byte ABI word.
    pub fn from_be_word(word: &[u8]) -> Option<Self> {
        U256::try_from_be_slice(word).map(Amount)
    }

    /// Canonical base-10 representation.
    pub fn to_canonical_string(&self) -> String {
        self.0.to_string()
    }

    pub fn inner(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Saturating addition; on-chain totals never legitimately reach 2^256.
    pub fn saturating_add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_mul(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_mul(rhs.0))
    }

    /// Subtract, clamping at zero. Returns the underflow details when clamping happened.
    pub fn clamped_sub(self, rhs: Amount) -> (Amount, Option<Underflow>) {
        match self.0.checked_sub(rhs.0) {
            Some(value) => (Amount(value), None),
            None => (
                Amount::ZERO,
                Some(Underflow {
                    current: self,
                    requested: rhs,
                }),
            ),
        }
    }

    /// Integer division truncating toward zero; division by zero yields zero.
    pub fn div_or_zero(self, rhs: Amount) -> Amount {
        if rhs.is_zero() {
            Amount::ZERO
        } else {
            Amount(self.0 / rhs.0)
        }
    }

    /// `self * 10_000 / total`, or zero when `total` is zero.
    pub fn basis_points_of(self, total: Amount) -> Amount {
        self.saturating_mul(Amount::from_u64(Self::BPS_DENOMINATOR))
            .div_or_zero(total)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<U256> for Amount {
    fn from(value: U256) -> Self {
        Amount(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount::from_u64(value)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => Amount::parse(&s).map_err(serde::de::Error::custom),
            Repr::Number(n) => Ok(Amount::from_u64(n)),
        }
    }
}
