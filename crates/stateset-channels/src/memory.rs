//! In-memory channel store for testing and ephemeral use.
//!
//! [`InMemoryChannelStore`] keeps records in a `HashMap` behind a `RwLock`.
//! Data is lost when the store is dropped.

use std::collections::HashMap;
use std::sync::RwLock;

use stateset_types::ChannelId;

use crate::channel::Channel;
use crate::error::{StoreError, StoreResult};
use crate::traits::ChannelStore;

#[derive(Debug, Default)]
pub struct InMemoryChannelStore {
    channels: RwLock<HashMap<ChannelId, Channel>>,
}

impl InMemoryChannelStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChannelStore for InMemoryChannelStore {
    fn get(&self, channel_id: &ChannelId) -> StoreResult<Option<Channel>> {
        let channels = self.channels.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(channels.get(channel_id).cloned())
    }

    fn put(&self, channel: &Channel) -> StoreResult<()> {
        let mut channels = self.channels.write().map_err(|_| StoreError::LockPoisoned)?;
        channels.insert(channel.channel_id.clone(), channel.clone());
        Ok(())
    }

    fn delete(&self, channel_id: &ChannelId) -> StoreResult<bool> {
        let mut channels = self.channels.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(channels.remove(channel_id).is_some())
    }

    fn list(&self) -> StoreResult<Vec<Channel>> {
        let channels = self.channels.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut result: Vec<Channel> = channels.values().cloned().collect();
        result.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));
        Ok(result)
    }
}
