//! Shared L2 cache: a TTL-bounded redis-backed key/value store.
//!
//! Every operation degrades to a no-op on connection failure rather than
//! propagating the error to the caller — grounded on `RedisCache` from
//! `api/services/caches/cascade_cache.py`'s companion module, which never
//! lets a cache outage abort a request.

use std::sync::atomic::{AtomicU64, Ordering};

use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

const DEFAULT_TTL_SECS: u64 = 300;

/// TTL-bounded shared cache over a redis connection pool.
pub struct L2Cache {
    client: redis::Client,
    default_ttl_secs: u64,
    errors: AtomicU64,
}

impl L2Cache {
    /// # Errors
    ///
    /// Returns a `redis::RedisError` if the connection URL cannot be parsed.
    /// Connection itself is lazy — failures there degrade to no-ops.
    pub fn new(url: &str, default_ttl_secs: u64) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(url)?,
            default_ttl_secs,
            errors: AtomicU64::new(0),
        })
    }

    async fn connection(&self) -> Option<redis::aio::MultiplexedConnection> {
        match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!(error = %e, "L2 cache connection failed, degrading to no-op");
                self.errors.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Deserializes the cached value, or returns `None` on a miss or any
    /// connection/deserialization failure.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.connection().await?;
        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, key, "L2 cache GET failed, degrading to no-op");
                self.errors.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Writes `value` with the given TTL (or the cache's default). Failures
    /// are logged and swallowed — the in-process caller's write-through
    /// path continues regardless.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: Option<u64>) {
        let Some(mut conn) = self.connection().await else {
            return;
        };
        let Ok(serialized) = serde_json::to_string(value) else {
            return;
        };
        let ttl = ttl_secs.unwrap_or(self.default_ttl_secs);
        if let Err(e) = conn
            .set_ex::<_, _, ()>(key, serialized, ttl)
            .await
        {
            warn!(error = %e, key, "L2 cache SET failed, degrading to no-op");
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub async fn delete(&self, key: &str) {
        let Some(mut conn) = self.connection().await else {
            return;
        };
        if let Err(e) = conn.del::<_, ()>(key).await {
            warn!(error = %e, key, "L2 cache DEL failed, degrading to no-op");
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Invalidates every key matching `pattern` via iterative SCAN + DEL.
    pub async fn flush_pattern(&self, pattern: &str) {
        let Some(mut conn) = self.connection().await else {
            return;
        };

        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = match redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, pattern, "L2 cache SCAN failed, degrading to no-op");
                    self.errors.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            };

            if !keys.is_empty() && conn.del::<_, ()>(keys).await.is_err() {
                self.errors.fetch_add(1, Ordering::Relaxed);
            }

            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }
    }

    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_host_degrades_to_none() {
        // Port 1 is reserved/unassigned; connection should fail promptly.
        let cache = L2Cache::new("redis://127.0.0.1:1/", DEFAULT_TTL_SECS).unwrap();
        let result: Option<String> = cache.get("search:anything").await;
        assert!(result.is_none());
        assert!(cache.error_count() >= 1);
    }

    #[tokio::test]
    async fn set_on_unreachable_host_does_not_panic() {
        let cache = L2Cache::new("redis://127.0.0.1:1/", DEFAULT_TTL_SECS).unwrap();
        cache.set("chunks:a.py:deadbeef", &vec!["noop"], None).await;
        assert!(cache.error_count() >= 1);
    }
}
