//! Foundation types for Stateset payment channels and vaults.
//!
//! The crypto and channel crates build on these.
//!
//! # Key Types
//!
//! - [`Address`]: Account address on the Stateset network
//! - [`Amount`]: Token amount in integer base units (decimal string on the wire)
//! - [`ChannelId`]: Opaque payment-channel identifier
//! - [`Digest`]: 32-byte BLAKE3 digest

pub mod address;
pub mod amount;
pub mod channel_id;
pub mod digest;
pub mod error;

pub use address::{Address, ADDRESS_PREFIX};
pub use amount::Amount;
pub use channel_id::ChannelId;
pub use digest::Digest;
pub use error::TypeError;
