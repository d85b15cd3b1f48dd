use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

/// Exact price of one collateral base unit, in debt base units.
///
/// Stored as a fraction so oracle prices like `1.2345` are represented
/// without rounding: `Price::new(12345, 10000)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPrice", into = "RawPrice")]
pub struct Price {
    numerator: u128,
    denominator: u128,
}

impl Price {
    pub fn new(numerator: u128, denominator: u128) -> Result<Self> {
        if numerator == 0 || denominator == 0 {
            return Err(VaultError::InvalidPrice {
                numerator,
                denominator,
            });
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// A whole-unit price (`denominator == 1`).
    pub fn whole(units: u128) -> Result<Self> {
        Self::new(units, 1)
    }

    pub fn numerator(&self) -> u128 {
        self.numerator
    }

    pub fn denominator(&self) -> u128 {
        self.denominator
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

// Serde view of `Price`. Integers travel as decimal strings so JSON
// consumers never round them.
#[derive(Serialize, Deserialize)]
struct RawPrice {
    numerator: String,
    denominator: String,
}

impl TryFrom<RawPrice> for Price {
    type Error = String;

    fn try_from(raw: RawPrice) -> std::result::Result<Self, Self::Error> {
        let parse = |s: &str| {
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("invalid integer: {s:?}"));
            }
            s.parse::<u128>().map_err(|e| e.to_string())
        };
        Price::new(parse(&raw.numerator)?, parse(&raw.denominator)?).map_err(|e| e.to_string())
    }
}

impl From<Price> for RawPrice {
    fn from(price: Price) -> Self {
        Self {
            numerator: price.numerator.to_string(),
            denominator: price.denominator.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_parts() {
        assert!(matches!(Price::new(0, 1), Err(VaultError::InvalidPrice { .. })));
        assert!(matches!(Price::new(1, 0), Err(VaultError::InvalidPrice { .. })));
        assert!(Price::whole(2).is_ok());
    }

    #[test]
    fn json_uses_decimal_strings() {
        let price = Price::new(12_345, 10_000).unwrap();
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, r#"{"numerator":"12345","denominator":"10000"}"#);
        assert_eq!(serde_json::from_str::<Price>(&json).unwrap(), price);
    }

    #[test]
    fn json_rejects_invalid_prices() {
        assert!(serde_json::from_str::<Price>(r#"{"numerator":"0","denominator":"1"}"#).is_err());
        assert!(serde_json::from_str::<Price>(r#"{"numerator":"-1","denominator":"1"}"#).is_err());
        assert!(serde_json::from_str::<Price>(r#"{"numerator":5,"denominator":1}"#).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(Price::new(3, 2).unwrap().to_string(), "3/2");
    }
}
