use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// A token amount in smallest-denomination base units.
///
/// Amounts are unsigned integers; there is no floating-point representation.
/// On the wire they are decimal strings so that values above 2^53 survive
/// JSON parsers that read numbers as doubles.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Amount(u128);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Wrap a base-unit value.
    pub const fn new(base_units: u128) -> Self {
        Self(base_units)
    }

    /// The raw base-unit value.
    pub const fn base_units(self) -> u128 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked addition. `None` on overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction. `None` if `rhs > self`.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl FromStr for Amount {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypeError::InvalidAmount(s.to_string()));
        }
        s.parse::<u128>()
            .map(Self)
            .map_err(|_| TypeError::InvalidAmount(s.to_string()))
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_arithmetic() {
        let a = Amount::new(10);
        let b = Amount::new(3);
        assert_eq!(a.checked_add(b), Some(Amount::new(13)));
        assert_eq!(a.checked_sub(b), Some(Amount::new(7)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(Amount::new(u128::MAX).checked_add(Amount::new(1)), None);
        assert_eq!(b.saturating_sub(a), Amount::ZERO);
    }

    #[test]
    fn parse_decimal_string() {
        assert_eq!("3500000".parse::<Amount>().unwrap(), Amount::new(3_500_000));
        assert!("".parse::<Amount>().is_err());
        assert!("-1".parse::<Amount>().is_err());
        assert!("1.5".parse::<Amount>().is_err());
        assert!("+5".parse::<Amount>().is_err());
    }

    #[test]
    fn serializes_as_decimal_string() {
        let json = serde_json::to_string(&Amount::new(10_000_000)).unwrap();
        assert_eq!(json, "\"10000000\"");
    }

    #[test]
    fn large_values_keep_precision_on_the_wire() {
        let big = Amount::new(u128::MAX);
        let json = serde_json::to_string(&big).unwrap();
        let parsed: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, big);
    }

    #[test]
    fn rejects_json_numbers() {
        assert!(serde_json::from_str::<Amount>("42").is_err());
    }
}
