//! Durable stream (redis Streams) configuration.

use serde::{Deserialize, Serialize};

fn default_url() -> String {
    "redis://127.0.0.1:6379".into()
}

fn default_consumer_group() -> String {
    "codegraph-indexers".into()
}

const fn default_idle_reclaim_ms() -> u64 {
    30_000
}

const fn default_batch_size() -> u32 {
    40
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Redis connection URL for the durable stream transport.
    #[serde(default = "default_url")]
    pub url: String,

    /// Consumer group name shared by all indexer processes.
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,

    /// Pending-entry idle threshold before another consumer may reclaim it
    /// via `XCLAIM`.
    #[serde(default = "default_idle_reclaim_ms")]
    pub idle_reclaim_ms: u64,

    /// Number of files grouped into one batch/stream entry.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            consumer_group: default_consumer_group(),
            idle_reclaim_ms: default_idle_reclaim_ms(),
            batch_size: default_batch_size(),
        }
    }
}
