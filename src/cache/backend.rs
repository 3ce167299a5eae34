//! Cache backend trait definition.
//!
//! Backends are plain TTL key-value stores with a tag index on the side.
//! Freshness and stale-while-revalidate logic live in the manager, not here.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Backend name for logs and health output
    fn mode(&self) -> &'static str;

    /// Get raw bytes for a key
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store raw bytes with a hard expiry
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Remove a key
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Record that `key` belongs to `tag` for as long as `key` lives
    async fn add_to_tag(&self, tag: &str, key: &str, ttl: Duration) -> CacheResult<()>;

    /// Return the unexpired keys recorded under `tag` and forget the tag
    async fn take_tag(&self, tag: &str) -> CacheResult<Vec<String>>;

    /// Remove every key starting with `prefix`, returning how many were removed
    async fn delete_prefix(&self, prefix: &str) -> CacheResult<usize>;

    /// Whether the store is reachable
    async fn is_available(&self) -> bool;
}
