//! Stale-while-revalidate cache manager.
//!
//! Values are stored as JSON envelopes carrying the time they were written and
//! how long they stay fresh. The backend TTL is `fresh_for + stale_for`, so the
//! backend drops entries on its own once they are too old to serve.
//!
//! Lookup order:
//! 1. fresh entry → returned as-is
//! 2. stale entry → returned, one background refresh per key is spawned
//! 3. missing or undecodable entry → fetched inline, stored, returned
//!
//! The cache is best-effort: backend failures are logged and treated as misses.

use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::backend::{CacheBackend, CacheResult};

/// How long a value is fresh, how long it may be served stale, and which tags it carries
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachePolicy {
    pub fresh_for: Duration,
    pub stale_for: Duration,
    pub tags: Vec<String>,
}

impl CachePolicy {
    pub fn new(fresh_for: Duration, stale_for: Duration) -> Self {
        Self {
            fresh_for,
            stale_for,
            tags: Vec::new(),
        }
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    fn backend_ttl(&self) -> Duration {
        self.fresh_for.saturating_add(self.stale_for)
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    stored_at_ms: u64,
    fresh_for_ms: u64,
    stale_for_ms: u64,
    value: serde_json::Value,
}

enum Lookup<T> {
    Fresh(T),
    Stale(T),
    Miss,
}

#[derive(Debug, PartialEq, Eq)]
enum Age {
    Fresh,
    Stale,
    Expired,
}

/// Fresh up to and including `fresh_for`, stale through `fresh_for + stale_for`
fn classify(age_ms: u64, fresh_for_ms: u64, stale_for_ms: u64) -> Age {
    if age_ms <= fresh_for_ms {
        Age::Fresh
    } else if age_ms <= fresh_for_ms.saturating_add(stale_for_ms) {
        Age::Stale
    } else {
        Age::Expired
    }
}

/// Counters exposed on the health endpoint
#[derive(Clone, Debug, Default, Serialize)]
pub struct CacheStats {
    pub mode: &'static str,
    pub hits: u64,
    pub stale_hits: u64,
    pub misses: u64,
}

struct Inner {
    backend: Arc<dyn CacheBackend>,
    defaults: CachePolicy,
    refreshing: Mutex<HashSet<String>>,
    hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Clone)]
pub struct CacheManager {
    inner: Arc<Inner>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl CacheManager {
    pub fn new(backend: Arc<dyn CacheBackend>, fresh_for: Duration, stale_for: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                defaults: CachePolicy::new(fresh_for, stale_for),
                refreshing: Mutex::new(HashSet::new()),
                hits: AtomicU64::new(0),
                stale_hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    /// Default policy (no tags) built from configuration
    pub fn policy(&self) -> CachePolicy {
        self.inner.defaults.clone()
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.inner.backend
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Lookup<T> {
        let raw = match self.inner.backend.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Lookup::Miss,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed");
                return Lookup::Miss;
            }
        };

        let envelope: Envelope = match serde_json::from_slice(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry");
                return Lookup::Miss;
            }
        };
        let value: T = match serde_json::from_value(envelope.value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache entry has unexpected shape");
                return Lookup::Miss;
            }
        };

        let age = now_ms().saturating_sub(envelope.stored_at_ms);
        match classify(age, envelope.fresh_for_ms, envelope.stale_for_ms) {
            Age::Fresh => Lookup::Fresh(value),
            Age::Stale => Lookup::Stale(value),
            Age::Expired => Lookup::Miss,
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T, policy: &CachePolicy) {
        if let Err(e) = self.try_store(key, value, policy).await {
            tracing::warn!(key = %key, error = %e, "cache write failed");
        }
    }

    async fn try_store<T: Serialize>(&self, key: &str, value: &T, policy: &CachePolicy) -> CacheResult<()> {
        let envelope = Envelope {
            stored_at_ms: now_ms(),
            fresh_for_ms: policy.fresh_for.as_millis() as u64,
            stale_for_ms: policy.stale_for.as_millis() as u64,
            value: serde_json::to_value(value)?,
        };
        let bytes = serde_json::to_vec(&envelope)?;

        self.inner.backend.set(key, bytes, policy.backend_ttl()).await?;
        for tag in &policy.tags {
            self.inner.backend.add_to_tag(tag, key, policy.backend_ttl()).await?;
        }
        tracing::debug!(key = %key, tags = ?policy.tags, "cache set");
        Ok(())
    }

    /// Return the cached value for `key`, fetching it when missing and
    /// refreshing it in the background when stale.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, policy: CachePolicy, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        E: Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        match self.lookup::<T>(key).await {
            Lookup::Fresh(value) => {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "cache hit");
                Ok(value)
            }
            Lookup::Stale(value) => {
                self.inner.stale_hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "cache hit (stale)");
                self.spawn_refresh(key, policy, fetch);
                Ok(value)
            }
            Lookup::Miss => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "cache miss");
                let value = fetch().await?;
                self.store(key, &value, &policy).await;
                Ok(value)
            }
        }
    }

    fn spawn_refresh<T, E, F, Fut>(&self, key: &str, policy: CachePolicy, fetch: F)
    where
        T: Serialize + Send + Sync + 'static,
        E: Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if !self.inner.refreshing.lock().insert(key.to_string()) {
            return;
        }

        let manager = self.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            match fetch().await {
                Ok(value) => manager.store(&key, &value, &policy).await,
                Err(e) => tracing::warn!(key = %key, error = %e, "background refresh failed, keeping stale entry"),
            }
            manager.inner.refreshing.lock().remove(&key);
        });
    }

    /// Drop a single key
    pub async fn invalidate_key(&self, key: &str) -> CacheResult<usize> {
        self.inner.backend.delete(key).await?;
        tracing::info!(key = %key, "cache key invalidated");
        Ok(1)
    }

    /// Drop every key recorded under `tag`
    ///
    /// Keys that fail to delete are put back under the tag so a later
    /// invalidation can still reach them; the first failure is returned.
    pub async fn invalidate_tag(&self, tag: &str) -> CacheResult<usize> {
        let backend = &self.inner.backend;
        let keys = backend.take_tag(tag).await?;
        let mut removed = 0;
        let mut first_error = None;

        for key in &keys {
            match backend.delete(key).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(tag = %tag, key = %key, error = %e, "tagged key not deleted");
                    let ttl = self.inner.defaults.backend_ttl();
                    if let Err(e) = backend.add_to_tag(tag, key, ttl).await {
                        tracing::warn!(tag = %tag, key = %key, error = %e, "failed to re-tag key");
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        tracing::info!(tag = %tag, keys = removed, "cache tag invalidated");
        Ok(removed)
    }

    /// Drop every key starting with `prefix`
    pub async fn invalidate_prefix(&self, prefix: &str) -> CacheResult<usize> {
        let removed = self.inner.backend.delete_prefix(prefix).await?;
        tracing::info!(prefix = %prefix, removed, "cache prefix invalidated");
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            mode: self.inner.backend.mode(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            stale_hits: self.inner.stale_hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }
}
