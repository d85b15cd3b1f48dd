//! Filesystem-backed channel store.
//!
//! Layout: one JSON document per channel under the store directory.
//!
//! ```text
//! <root>/<blake3(channel_id) hex>.json
//! ```
//!
//! File names have a fixed length whatever the id; the id itself is kept
//! inside the record.
//!
//! Writes go to a temporary file in the same directory which is then
//! renamed over the target, so a crash leaves either the old or the new
//! record on disk, never a torn one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use stateset_types::{ChannelId, Digest};
use tracing::{debug, warn};

use crate::channel::Channel;
use crate::error::{StoreError, StoreResult};
use crate::traits::ChannelStore;

const RECORD_EXTENSION: &str = "json";

#[derive(Debug)]
pub struct FileChannelStore {
    root: PathBuf,
    lock: RwLock<()>,
}

impl FileChannelStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "opened file channel store");
        Ok(Self {
            root,
            lock: RwLock::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, channel_id: &ChannelId) -> PathBuf {
        self.root
            .join(format!("{}.{RECORD_EXTENSION}", Digest::of(channel_id.as_bytes()).to_hex()))
    }

    fn read_record(path: &Path) -> StoreResult<Option<Channel>> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let channel =
            serde_json::from_slice(&data).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(channel))
    }
}

impl ChannelStore for FileChannelStore {
    fn get(&self, channel_id: &ChannelId) -> StoreResult<Option<Channel>> {
        let _guard = self.lock.read().map_err(|_| StoreError::LockPoisoned)?;
        Self::read_record(&self.record_path(channel_id))
    }

    fn put(&self, channel: &Channel) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(channel)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let _guard = self.lock.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.record_path(&channel.channel_id))
            .map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn delete(&self, channel_id: &ChannelId) -> StoreResult<bool> {
        let _guard = self.lock.write().map_err(|_| StoreError::LockPoisoned)?;
        match fs::remove_file(self.record_path(channel_id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> StoreResult<Vec<Channel>> {
        let _guard = self.lock.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut channels = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            match Self::read_record(&path) {
                Ok(Some(channel)) => channels.push(channel),
                Ok(None) => {}
                Err(StoreError::Serialization(reason)) => {
                    warn!(path = %path.display(), %reason, "skipping unreadable channel record");
                }
                Err(e) => return Err(e),
            }
        }
        channels.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use stateset_types::Amount;

    use super::*;
    use crate::memory::tests::sample_channel;

    #[test]
    fn put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChannelStore::open(dir.path()).unwrap();
        let channel = sample_channel("ch-file");
        store.put(&channel).unwrap();
        assert_eq!(store.get(&channel.channel_id).unwrap(), Some(channel));
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = sample_channel("ch-persist");
        channel.total_sent = Amount::new(1_500_000);
        channel.nonce = 3;
        {
            let store = FileChannelStore::open(dir.path()).unwrap();
            store.put(&channel).unwrap();
        }
        let reopened = FileChannelStore::open(dir.path()).unwrap();
        let loaded = reopened.get(&channel.channel_id).unwrap().unwrap();
        assert_eq!(loaded.nonce, 3);
        assert_eq!(loaded.total_sent, Amount::new(1_500_000));
    }

    #[test]
    fn ids_with_path_separators_stay_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChannelStore::open(dir.path()).unwrap();
        let channel = sample_channel("../escape/attempt");
        store.put(&channel).unwrap();
        assert!(store.get(&channel.channel_id).unwrap().is_some());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn longest_ids_fit_in_a_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChannelStore::open(dir.path()).unwrap();
        let channel = sample_channel(&"c".repeat(128));
        store.put(&channel).unwrap();
        assert_eq!(store.get(&channel.channel_id).unwrap(), Some(channel.clone()));
        assert_eq!(store.list().unwrap(), vec![channel.clone()]);
        assert!(store.delete(&channel.channel_id).unwrap());
    }

    #[test]
    fn delete_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChannelStore::open(dir.path()).unwrap();
        let channel = sample_channel("ch-del");
        store.put(&channel).unwrap();
        assert!(store.delete(&channel.channel_id).unwrap());
        assert!(!store.delete(&channel.channel_id).unwrap());
        assert!(store.get(&channel.channel_id).unwrap().is_none());
    }

    #[test]
    fn list_skips_foreign_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChannelStore::open(dir.path()).unwrap();
        store.put(&sample_channel("ch-b")).unwrap();
        store.put(&sample_channel("ch-a")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();
        fs::write(dir.path().join("deadbeef.json"), b"{not json").unwrap();

        let ids: Vec<String> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|c| c.channel_id.to_string())
            .collect();
        assert_eq!(ids, vec!["ch-a", "ch-b"]);
    }
}
