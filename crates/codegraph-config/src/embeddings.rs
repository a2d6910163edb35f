//! Dual-embedding service configuration.

use serde::{Deserialize, Serialize};

fn default_text_model() -> String {
    "BGEBaseENV15".into()
}

fn default_code_model() -> String {
    "JinaEmbeddingsV2BaseCode".into()
}

fn default_cache_dir() -> String {
    ".cache/codegraph/models".into()
}

const fn default_batch_size() -> u32 {
    32
}

const fn default_memory_cap_mb() -> u64 {
    2_500
}

const fn default_breaker_failure_threshold() -> u32 {
    5
}

const fn default_breaker_recovery_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_text_model")]
    pub text_model: String,

    #[serde(default = "default_code_model")]
    pub code_model: String,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Resident-memory cap, in MiB, checked before the (larger) code model
    /// is loaded alongside the text model.
    #[serde(default = "default_memory_cap_mb")]
    pub memory_cap_mb: u64,

    #[serde(default = "default_breaker_failure_threshold")]
    pub breaker_failure_threshold: u32,

    #[serde(default = "default_breaker_recovery_secs")]
    pub breaker_recovery_secs: u64,

    /// Deterministic MD5-seeded vectors instead of real model inference.
    #[serde(default)]
    pub mock_mode: bool,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            text_model: default_text_model(),
            code_model: default_code_model(),
            cache_dir: default_cache_dir(),
            batch_size: default_batch_size(),
            memory_cap_mb: default_memory_cap_mb(),
            breaker_failure_threshold: default_breaker_failure_threshold(),
            breaker_recovery_secs: default_breaker_recovery_secs(),
            mock_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = EmbeddingsConfig::default();
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.memory_cap_mb, 2_500);
        assert_eq!(config.breaker_failure_threshold, 5);
        assert_eq!(config.breaker_recovery_secs, 60);
        assert!(!config.mock_mode);
    }
}
