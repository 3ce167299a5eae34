//! In-process cache backend, used when no Redis URL is configured.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::backend::{CacheBackend, CacheResult};

struct Slot {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Tag name → member key → when the member stops mattering
type TagIndex = HashMap<String, HashMap<String, Instant>>;

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Slot>>,
    tags: RwLock<TagIndex>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[cfg(test)]
    pub fn tag_members(&self, tag: &str) -> usize {
        self.tags.read().get(tag).map_or(0, HashMap::len)
    }

    /// Drop expired slots and expired tag members, returning how many slots went
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let removed = {
            let mut entries = self.entries.write();
            let before = entries.len();
            entries.retain(|_, slot| slot.expires_at > now);
            before - entries.len()
        };

        let mut tags = self.tags.write();
        for members in tags.values_mut() {
            members.retain(|_, expires_at| *expires_at > now);
        }
        tags.retain(|_, members| !members.is_empty());

        removed
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    fn mode(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .filter(|slot| slot.expires_at > Instant::now())
            .map(|slot| slot.value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let slot = Slot {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.to_string(), slot);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn add_to_tag(&self, tag: &str, key: &str, ttl: Duration) -> CacheResult<()> {
        let expires_at = Instant::now() + ttl;
        let mut tags = self.tags.write();
        let member = tags
            .entry(tag.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert(expires_at);
        *member = (*member).max(expires_at);
        Ok(())
    }

    async fn take_tag(&self, tag: &str) -> CacheResult<Vec<String>> {
        let now = Instant::now();
        let members = self.tags.write().remove(tag).unwrap_or_default();
        Ok(members
            .into_iter()
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(key, _)| key)
            .collect())
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<usize> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }

    async fn is_available(&self) -> bool {
        true
    }
}
