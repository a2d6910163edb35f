//! Shared L2 cache (redis) configuration.

use serde::{Deserialize, Serialize};

fn default_url() -> String {
    "redis://127.0.0.1:6379".into()
}

const fn default_ttl_secs() -> u64 {
    300
}

const fn default_l1_max_bytes() -> u64 {
    100 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Redis connection URL for the shared L2 cache.
    #[serde(default = "default_url")]
    pub url: String,

    /// Default TTL for L2 entries.
    #[serde(default = "default_ttl_secs")]
    pub l2_ttl_secs: u64,

    /// Byte budget for the in-process L1 LRU cache.
    #[serde(default = "default_l1_max_bytes")]
    pub l1_max_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            l2_ttl_secs: default_ttl_secs(),
            l1_max_bytes: default_l1_max_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = CacheConfig::default();
        assert_eq!(config.url, "redis://127.0.0.1:6379");
        assert_eq!(config.l2_ttl_secs, 300);
        assert_eq!(config.l1_max_bytes, 100 * 1024 * 1024);
    }
}
