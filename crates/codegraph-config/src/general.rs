//! General engine-wide configuration.

use serde::{Deserialize, Serialize};

const fn default_search_limit() -> u32 {
    20
}

const fn default_parse_timeout_ms() -> u64 {
    2_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Default result limit for search queries.
    #[serde(default = "default_search_limit")]
    pub default_search_limit: u32,

    /// Wall-clock budget for a single-file AST parse before falling back to
    /// fixed-size chunking.
    #[serde(default = "default_parse_timeout_ms")]
    pub parse_timeout_ms: u64,

    /// When set, embeddings and LSP hover lookups are skipped in favor of
    /// deterministic mock values — used for tests and CI.
    #[serde(default)]
    pub mock_mode: bool,

    /// Repository name used when not explicitly supplied by the caller.
    #[serde(default)]
    pub default_repository: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_search_limit: default_search_limit(),
            parse_timeout_ms: default_parse_timeout_ms(),
            mock_mode: false,
            default_repository: String::new(),
        }
    }
}
