use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Human-readable prefix of Stateset account addresses.
pub const ADDRESS_PREFIX: &str = "stateset1";

const MAX_ADDRESS_LEN: usize = 128;

/// An account address on the Stateset network.
///
/// Addresses are opaque to this crate beyond a light syntactic check: they
/// must be non-empty, at most 128 characters, and made of ASCII
/// alphanumerics. Addresses for local keys are derived from the public key
/// with [`Address::from_public_key`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse and validate an address string.
    pub fn new(address: impl Into<String>) -> Result<Self, TypeError> {
        let address = address.into();
        if address.is_empty() {
            return Err(TypeError::InvalidAddress {
                address,
                reason: "address is empty".into(),
            });
        }
        if address.len() > MAX_ADDRESS_LEN {
            return Err(TypeError::InvalidAddress {
                address,
                reason: format!("longer than {MAX_ADDRESS_LEN} characters"),
            });
        }
        if !address.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TypeError::InvalidAddress {
                address,
                reason: "only ASCII alphanumerics are allowed".into(),
            });
        }
        Ok(Self(address))
    }

    /// Derive the address of a 32-byte public key.
    ///
    /// The address is the prefix followed by the hex of the first 20 bytes of
    /// a domain-separated BLAKE3 hash of the key. The same key always
    /// produces the same address.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"stateset-address-v1:");
        hasher.update(public_key);
        let hash = hasher.finalize();
        Self(format!("{ADDRESS_PREFIX}{}", hex::encode(&hash.as_bytes()[..20])))
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for logs (first 12 characters).
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl TryFrom<String> for Address {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
