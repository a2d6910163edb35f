//! Relational store (libSQL) configuration.

use serde::{Deserialize, Serialize};

fn default_url() -> String {
    "file:codegraph.db".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// libSQL URL, e.g. `file:codegraph.db` or `libsql://mydb.turso.io`.
    #[serde(default = "default_url")]
    pub url: String,

    /// Auth token for remote libSQL databases.
    #[serde(default)]
    pub auth_token: String,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

const fn default_max_connections() -> u32 {
    8
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            auth_token: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.url.starts_with("libsql://") || self.url.starts_with("https://")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_local_file() {
        let config = DatabaseConfig::default();
        assert!(!config.is_remote());
        assert_eq!(config.url, "file:codegraph.db");
    }

    #[test]
    fn remote_url_detected() {
        let config = DatabaseConfig {
            url: "libsql://prod.turso.io".into(),
            ..Default::default()
        };
        assert!(config.is_remote());
    }
}
