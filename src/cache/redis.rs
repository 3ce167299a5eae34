//! Redis cache backend.
//!
//! All keys are namespaced (`site:` by default) so several sites can share an
//! instance. Cached values live under `<ns>k:` and tags under `<ns>t:`, so a
//! prefix deletion never reaches the tag index. A tag is a sorted set of the
//! caller's (un-namespaced) keys scored by the unix time they expire at.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client,
};

use super::backend::{CacheBackend, CacheResult};

pub struct RedisCache {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisCache {
    pub async fn connect(redis_url: &str, namespace: &str) -> CacheResult<Self> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(500));

        let client = Client::open(redis_url)?;
        let conn = client.get_connection_manager_with_config(config).await?;
        tracing::info!(namespace = %namespace, "Connected to Redis cache");

        Ok(Self {
            conn,
            namespace: namespace.to_string(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}k:{}", self.namespace, key)
    }

    fn tag_key(&self, tag: &str) -> String {
        format!("{}t:{}", self.namespace, tag)
    }

    fn prefix_pattern(&self, prefix: &str) -> String {
        format!("{}*", escape_glob(&self.key(prefix)))
    }
}

/// Escape `SCAN MATCH` metacharacters so the input matches literally
fn escape_glob(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn mode(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(self.key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(self.key(key), value, secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.key(key)).await?;
        Ok(())
    }

    async fn add_to_tag(&self, tag: &str, key: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let tag_key = self.tag_key(tag);
        let now = unix_secs();
        let expires_at = now + ttl.as_secs().max(1);

        // ZADD GT keeps the later expiry when a key is re-tagged
        let _: () = redis::cmd("ZADD")
            .arg(&tag_key)
            .arg("GT")
            .arg(expires_at)
            .arg(key)
            .query_async(&mut conn)
            .await?;
        let _: () = conn.zrembyscore(&tag_key, "-inf", now).await?;

        // The tag set lives as long as its longest-lived member
        let latest: Vec<(String, f64)> = conn.zrange_withscores(&tag_key, -1, -1).await?;
        if let Some((_, last)) = latest.first() {
            let _: () = conn.expire_at(&tag_key, *last as i64).await?;
        }
        Ok(())
    }

    async fn take_tag(&self, tag: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let tag_key = self.tag_key(tag);
        let members: Vec<String> = conn.zrangebyscore(&tag_key, unix_secs(), "+inf").await?;
        conn.del::<_, ()>(&tag_key).await?;
        Ok(members)
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<usize> {
        let mut conn = self.conn.clone();
        let pattern = self.prefix_pattern(prefix);
        let mut cursor: u64 = 0;
        let mut removed = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                removed += keys.len();
                conn.del::<_, ()>(keys).await?;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }

    async fn is_available(&self) -> bool {
        let mut conn = self.conn.clone();
        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("site:k:games:"), "site:k:games:");
        assert_eq!(escape_glob("a*b?c[d]e\\f"), "a\\*b\\?c\\[d\\]e\\\\f");
    }
}
