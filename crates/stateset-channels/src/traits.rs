//! The [`ChannelStore`] trait defining the channel repository interface.
//!
//! Any backend (in-memory, filesystem, database) implements this trait so
//! the ledger logic does not depend on where channel records live.

use stateset_types::ChannelId;

use crate::channel::Channel;
use crate::error::StoreResult;

/// Storage backend for channel records, keyed by channel id.
///
/// Implementations must be thread-safe (`Send + Sync`). A `put` replaces the
/// whole record, so a payment update (total, nonce and signature together)
/// lands in a single write.
pub trait ChannelStore: Send + Sync {
    /// Read a channel record. Returns `Ok(None)` if it does not exist.
    fn get(&self, channel_id: &ChannelId) -> StoreResult<Option<Channel>>;

    /// Create or replace a channel record.
    fn put(&self, channel: &Channel) -> StoreResult<()>;

    /// Delete a channel record. Returns `Ok(true)` if it existed.
    fn delete(&self, channel_id: &ChannelId) -> StoreResult<bool>;

    /// All stored records, ordered by channel id.
    fn list(&self) -> StoreResult<Vec<Channel>>;
}

impl<T: ChannelStore + ?Sized> ChannelStore for Box<T> {
    fn get(&self, channel_id: &ChannelId) -> StoreResult<Option<Channel>> {
        (**self).get(channel_id)
    }

    fn put(&self, channel: &Channel) -> StoreResult<()> {
        (**self).put(channel)
    }

    fn delete(&self, channel_id: &ChannelId) -> StoreResult<bool> {
        (**self).delete(channel_id)
    }

    fn list(&self) -> StoreResult<Vec<Channel>> {
        (**self).list()
    }
}
