//! Content cache.
//!
//! Provides a pluggable key-value store that can be backed by:
//! - an in-process map (default, single instance)
//! - Redis (shared between instances)
//!
//! `CacheManager` layers stale-while-revalidate semantics and tag-based
//! invalidation on top of whichever backend is configured.

mod backend;
pub mod keys;
mod manager;
mod memory;
mod redis;

use std::sync::Arc;
use std::time::Duration;

pub use backend::{CacheBackend, CacheError, CacheResult};
pub use manager::{CacheManager, CachePolicy, CacheStats};
pub use memory::MemoryCache;
pub use self::redis::RedisCache;

use crate::config::Config;

/// Namespace prepended to every Redis key
pub const REDIS_NAMESPACE: &str = "site:";

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// In-process backend with a background task dropping expired entries.
/// The task ends once the cache itself is dropped.
pub fn memory_backend() -> Arc<MemoryCache> {
    let cache = Arc::new(MemoryCache::new());
    let weak = Arc::downgrade(&cache);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(cache) = weak.upgrade() else {
                break;
            };
            let removed = cache.purge_expired();
            if removed > 0 {
                tracing::debug!(removed, remaining = cache.len(), "purged expired cache entries");
            }
        }
    });
    cache
}

/// Build the cache manager described by the configuration
pub async fn build(config: &Config) -> CacheResult<CacheManager> {
    let backend: Arc<dyn CacheBackend> = match &config.redis_url {
        Some(url) => Arc::new(RedisCache::connect(url, REDIS_NAMESPACE).await?),
        None => {
            tracing::info!("REDIS_URL not set, using in-memory cache");
            memory_backend() as Arc<dyn CacheBackend>
        }
    };

    Ok(CacheManager::new(backend, config.cache_fresh_for, config.cache_stale_for))
}
