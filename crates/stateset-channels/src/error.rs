use chrono::{DateTime, Utc};
use stateset_crypto::SignatureError;
use stateset_types::{Amount, ChannelId};

/// Errors produced by channel ledger and receiver operations.
///
/// Every variant is detected before any state is mutated.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel not found: {0}")]
    ChannelNotFound(ChannelId),

    #[error("channel already registered: {0}")]
    ChannelExists(ChannelId),

    #[error("channel {0} is closed")]
    ChannelClosed(ChannelId),

    #[error("channel {0} is already closed")]
    AlreadyClosed(ChannelId),

    #[error("channel {channel_id} expired at {expires_at}")]
    ChannelExpired {
        channel_id: ChannelId,
        expires_at: DateTime<Utc>,
    },

    #[error("channel {channel_id} does not expire until {expires_at}")]
    NotExpired {
        channel_id: ChannelId,
        expires_at: DateTime<Utc>,
    },

    #[error("channel {0} is still open; close it before confirming settlement")]
    ChannelStillOpen(ChannelId),

    #[error("capacity exceeded on {channel_id}: {requested} requested, {remaining} remaining")]
    CapacityExceeded {
        channel_id: ChannelId,
        requested: Amount,
        remaining: Amount,
    },

    #[error("payment amount must be positive")]
    InvalidAmount,

    #[error("invalid deposit {deposit}: minimum is {minimum}")]
    InvalidDeposit { deposit: Amount, minimum: Amount },

    #[error("invalid expiry {expires_at}: {reason}")]
    InvalidExpiry {
        expires_at: DateTime<Utc>,
        reason: String,
    },

    #[error("counterparty must differ from the channel sender")]
    InvalidCounterparty,

    #[error("stale state for {channel_id}: nonce {received} is not above {current}")]
    StaleNonce {
        channel_id: ChannelId,
        current: u64,
        received: u64,
    },

    #[error("state for {channel_id} decreases total from {current} to {received}")]
    AmountDecreased {
        channel_id: ChannelId,
        current: Amount,
        received: Amount,
    },

    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from channel store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Errors reported by a settlement backend.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettlementError {
    #[error("unknown channel: {0}")]
    UnknownChannel(ChannelId),

    #[error("channel {0} already settled")]
    AlreadySettled(ChannelId),

    #[error("settlement amount {amount} exceeds deposit {deposit}")]
    AmountExceedsDeposit { amount: Amount, deposit: Amount },

    #[error("settlement signature rejected: {0}")]
    InvalidSignature(String),

    #[error("settlement rejected: {0}")]
    Rejected(String),

    #[error("settlement backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors from [`ChannelClient`](crate::client::ChannelClient) flows that
/// combine local bookkeeping with settlement submission.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("settlement error: {0}")]
    Settlement(#[from] SettlementError),

    /// The deposit was locked on-chain under `channel_id` but the local
    /// record could not be written.
    #[error("deposit locked for {channel_id} but channel not recorded: {source}")]
    Unrecorded {
        channel_id: ChannelId,
        source: ChannelError,
    },
}

/// Convenience alias for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
