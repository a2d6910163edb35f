//! # codegraph-config
//!
//! Layered configuration loading for the code intelligence engine, using
//! figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`CODEGRAPH_*`, double-underscore nested)
//! 2. Project-level `.codegraph/config.toml`
//! 3. User-level `~/.config/codegraph/config.toml`
//! 4. Built-in defaults

pub mod cache;
pub mod database;
pub mod embeddings;
pub mod error;
pub mod general;
pub mod lsp;
pub mod stream;
pub mod vector_store;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use embeddings::EmbeddingsConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use lsp::LspConfig;
pub use stream::StreamConfig;
pub use vector_store::VectorStoreConfig;

const ENV_PREFIX: &str = "CODEGRAPH_";
const PROJECT_CONFIG_PATH: &str = ".codegraph/config.toml";

/// Aggregate configuration for the whole engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CodegraphConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub lsp: LspConfig,
}

impl CodegraphConfig {
    /// Load configuration from the full provider chain: defaults → user
    /// config → project config → environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(home) = dirs::config_dir() {
            let user_path = home.join("codegraph").join("config.toml");
            if user_path.exists() {
                figment = figment.merge(Toml::file(user_path));
            }
        }

        if std::path::Path::new(PROJECT_CONFIG_PATH).exists() {
            figment = figment.merge(Toml::file(PROJECT_CONFIG_PATH));
        }

        let _ = dotenvy::dotenv();
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().map_err(ConfigError::from)
    }

    /// Load with an additional slice of `(key, value)` overrides merged in
    /// ahead of process environment variables — used by the subprocess
    /// worker contract to forward parent configuration explicitly.
    ///
    /// Keys use the same shape as the real environment variables
    /// (`CODEGRAPH_SECTION__FIELD`); process environment variables of the
    /// same name still win, matching `Env::prefixed` precedence.
    pub fn load_with_env_overrides(overrides: &[(String, String)]) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if std::path::Path::new(PROJECT_CONFIG_PATH).exists() {
            figment = figment.merge(Toml::file(PROJECT_CONFIG_PATH));
        }

        let overrides_value = overrides_to_value(overrides);
        figment = figment.merge(Serialized::defaults(overrides_value));
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        figment.extract().map_err(ConfigError::from)
    }
}

/// Build a nested JSON object from `CODEGRAPH_SECTION__FIELD` style keys,
/// mirroring how `figment::providers::Env::prefixed(...).split("__")`
/// interprets real environment variables.
fn overrides_to_value(overrides: &[(String, String)]) -> serde_json::Value {
    let mut root = serde_json::Map::new();
    for (key, value) in overrides {
        let stripped = key.strip_prefix(ENV_PREFIX).unwrap_or(key);
        let segments: Vec<&str> = stripped.split("__").collect();
        insert_nested(&mut root, &segments, value);
    }
    serde_json::Value::Object(root)
}

fn insert_nested(map: &mut serde_json::Map<String, serde_json::Value>, segments: &[&str], value: &str) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    let key = head.to_lowercase();
    if rest.is_empty() {
        map.insert(key, serde_json::Value::String(value.to_string()));
        return;
    }
    let entry = map
        .entry(key)
        .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
    if let serde_json::Value::Object(nested) = entry {
        insert_nested(nested, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_compose() {
        let config = CodegraphConfig::default();
        assert_eq!(config.general.default_search_limit, 20);
        assert_eq!(config.database.url, "file:codegraph.db");
        assert_eq!(config.cache.l2_ttl_secs, 300);
    }
}
