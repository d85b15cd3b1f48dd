use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use stateset_types::Amount;

use crate::error::{ConfigError, StoreResult};
use crate::file::FileChannelStore;
use crate::memory::InMemoryChannelStore;
use crate::traits::ChannelStore;

/// Configuration for a payment channel ledger.
///
/// Loadable from TOML:
///
/// ```toml
/// min_deposit = "1000000"
/// max_channel_duration_secs = 604800
///
/// [store]
/// kind = "file"
/// path = "/var/lib/stateset/channels"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Smallest deposit accepted at open time. Never below one base unit.
    pub min_deposit: Amount,
    /// Longest allowed channel lifetime. `None` disables the check.
    pub max_channel_duration_secs: Option<u64>,
    /// Where channel records are kept.
    pub store: StoreConfig,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            min_deposit: Amount::new(1),
            max_channel_duration_secs: Some(30 * 24 * 60 * 60),
            store: StoreConfig::Memory,
        }
    }
}

/// Channel store backend selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Records live only as long as the process.
    Memory,
    /// One JSON file per channel under `path`.
    File { path: PathBuf },
}

impl ChannelConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_deposit.is_zero() {
            return Err(ConfigError::Invalid("min_deposit must be at least 1".into()));
        }
        if let Some(secs) = self.max_channel_duration_secs {
            if secs == 0 {
                return Err(ConfigError::Invalid(
                    "max_channel_duration_secs must be positive".into(),
                ));
            }
            if duration_from_secs(secs).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "max_channel_duration_secs {secs} is out of range"
                )));
            }
        }
        Ok(())
    }

    /// The effective minimum deposit, clamped to one base unit.
    pub fn effective_min_deposit(&self) -> Amount {
        self.min_deposit.max(Amount::new(1))
    }

    /// Longest allowed channel lifetime. A value too large to represent is
    /// treated as no limit; `validate` rejects it at load time.
    pub fn max_channel_duration(&self) -> Option<Duration> {
        self.max_channel_duration_secs.and_then(duration_from_secs)
    }

    /// Build the configured store backend.
    pub fn open_store(&self) -> StoreResult<Box<dyn ChannelStore>> {
        Ok(match &self.store {
            StoreConfig::Memory => Box::new(InMemoryChannelStore::new()),
            StoreConfig::File { path } => Box::new(FileChannelStore::open(path)?),
        })
    }
}

fn duration_from_secs(secs: u64) -> Option<Duration> {
    i64::try_from(secs).ok().and_then(Duration::try_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ChannelConfig::default();
        assert_eq!(c.min_deposit, Amount::new(1));
        assert_eq!(c.max_channel_duration(), Some(Duration::days(30)));
        assert_eq!(c.store, StoreConfig::Memory);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn parse_full_toml() {
        let c = ChannelConfig::from_toml_str(
            r#"
            min_deposit = "1000000"
            max_channel_duration_secs = 3600

            [store]
            kind = "file"
            path = "/tmp/channels"
            "#,
        )
        .unwrap();
        assert_eq!(c.min_deposit, Amount::new(1_000_000));
        assert_eq!(c.max_channel_duration(), Some(Duration::hours(1)));
        assert_eq!(
            c.store,
            StoreConfig::File {
                path: PathBuf::from("/tmp/channels")
            }
        );
    }

    #[test]
    fn empty_toml_uses_defaults() {
        assert_eq!(ChannelConfig::from_toml_str("").unwrap(), ChannelConfig::default());
    }

    #[test]
    fn zero_min_deposit_is_invalid() {
        let err = ChannelConfig::from_toml_str(r#"min_deposit = "0""#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn oversized_duration_is_rejected() {
        for secs in ["10000000000000000", "9223372036854775807"] {
            let err = ChannelConfig::from_toml_str(&format!("max_channel_duration_secs = {secs}"))
                .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)));
        }
        let largest = ChannelConfig::from_toml_str("max_channel_duration_secs = 9000000000000000").unwrap();
        assert_eq!(largest.max_channel_duration(), Some(Duration::seconds(9_000_000_000_000_000)));
    }

    #[test]
    fn unvalidated_oversized_duration_means_no_limit() {
        let config = ChannelConfig {
            max_channel_duration_secs: Some(u64::MAX),
            ..Default::default()
        };
        assert_eq!(config.max_channel_duration(), None);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = ChannelConfig::from_toml_str("min_deposit = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channels.toml");
        std::fs::write(&path, "max_channel_duration_secs = 60\n").unwrap();
        let c = ChannelConfig::load(&path).unwrap();
        assert_eq!(c.max_channel_duration(), Some(Duration::seconds(60)));
    }

    #[test]
    fn open_file_store_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = ChannelConfig {
            store: StoreConfig::File {
                path: dir.path().join("store"),
            },
            ..Default::default()
        };
        let store = config.open_store().unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(dir.path().join("store").is_dir());
    }
}
