//! Cache error types.

use thiserror::Error;

/// Errors from the shared L2 cache. These are intentionally narrow: callers
/// treat every variant as "degrade to uncached" rather than aborting.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis connection error: {0}")]
    Connection(String),

    #[error("redis command error: {0}")]
    Command(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
