//! Off-chain payment channels for Stateset.
//!
//! A sender locks a deposit on-chain, then streams many small payments to a
//! counterparty without touching the chain. Each payment bumps a cumulative
//! total and a nonce, and the sender signs the new state. Only the final
//! total is settled on-chain when the channel closes or expires.
//!
//! - [`PaymentChannelLedger`]: sender-side bookkeeping and signing
//! - [`ChannelReceiver`]: recipient-side verification of incoming states
//! - [`ChannelStore`]: persistence boundary, with memory and file backends
//! - [`Settlement`]: the on-chain boundary, with [`LocalSettlement`] for tests
//! - [`ChannelClient`]: ledger and settlement composed into full flows

pub mod channel;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod file;
pub mod ledger;
pub mod memory;
pub mod receiver;
pub mod settlement;
pub mod traits;

pub use channel::{
    sign_state, state_digest, Channel, ChannelState, ChannelStatus, SettlementKind,
    SettlementRequest,
};
pub use client::ChannelClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ChannelConfig, StoreConfig};
pub use error::{
    ChannelError, ClientError, ConfigError, Result, SettlementError, StoreError, StoreResult,
};
pub use file::FileChannelStore;
pub use ledger::PaymentChannelLedger;
pub use memory::InMemoryChannelStore;
pub use receiver::ChannelReceiver;
pub use settlement::{LocalSettlement, Settlement, SettlementReceipt};
pub use traits::ChannelStore;
