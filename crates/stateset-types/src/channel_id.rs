use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const MAX_CHANNEL_ID_LEN: usize = 128;

/// Opaque identifier of a payment channel.
///
/// The settlement layer assigns channel ids when a channel is opened; this
/// type only requires a non-empty printable string without whitespace.
/// [`ChannelId::generate`] creates time-ordered ids (`ch-` + UUID v7) for
/// local settlement.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId(String);

impl ChannelId {
    /// Validate an externally assigned id.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= MAX_CHANNEL_ID_LEN
            && id.chars().all(|c| c.is_ascii_graphic());
        if !valid {
            return Err(TypeError::InvalidChannelId(id));
        }
        Ok(Self(id))
    }

    /// Generate a new time-ordered id.
    pub fn generate() -> Self {
        Self(format!("ch-{}", uuid::Uuid::now_v7()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw bytes, as they are bound into signed channel states.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl TryFrom<String> for ChannelId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChannelId> for String {
    fn from(id: ChannelId) -> Self {
        id.0
    }
}

impl FromStr for ChannelId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_prefixed() {
        let a = ChannelId::generate();
        let b = ChannelId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("ch-"));
    }

    #[test]
    fn generated_ids_are_valid() {
        let id = ChannelId::generate();
        assert_eq!(ChannelId::new(id.as_str()).unwrap(), id);
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert!(ChannelId::new("").is_err());
        assert!(ChannelId::new("ch 1").is_err());
        assert!(ChannelId::new("ch\n1").is_err());
    }

    #[test]
    fn accepts_external_ids() {
        let id = ChannelId::new("channel-42").unwrap();
        assert_eq!(id.to_string(), "channel-42");
    }

    #[test]
    fn serde_is_a_plain_string() {
        let id = ChannelId::new("channel-7").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"channel-7\"");
        assert!(serde_json::from_str::<ChannelId>("\"\"").is_err());
    }
}
