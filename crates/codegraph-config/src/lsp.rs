//! Language-server client configuration.

use serde::{Deserialize, Serialize};

fn default_python_command() -> String {
    "pyright-langserver".into()
}

fn default_typescript_command() -> String {
    "typescript-language-server".into()
}

const fn default_hover_timeout_ms() -> u64 {
    2_000
}

const fn default_max_restarts() -> u32 {
    3
}

const fn default_restart_backoff_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LspConfig {
    #[serde(default = "default_python_command")]
    pub python_command: String,

    #[serde(default = "default_typescript_command")]
    pub typescript_command: String,

    /// Whether LSP-assisted type extraction is attempted at all. When
    /// `false` the orchestrator skips spawning any language server.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_hover_timeout_ms")]
    pub hover_timeout_ms: u64,

    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,

    #[serde(default = "default_restart_backoff_ms")]
    pub restart_backoff_ms: u64,
}

const fn default_enabled() -> bool {
    true
}

impl Default for LspConfig {
    fn default() -> Self {
        Self {
            python_command: default_python_command(),
            typescript_command: default_typescript_command(),
            enabled: default_enabled(),
            hover_timeout_ms: default_hover_timeout_ms(),
            max_restarts: default_max_restarts(),
            restart_backoff_ms: default_restart_backoff_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = LspConfig::default();
        assert!(config.enabled);
        assert_eq!(config.hover_timeout_ms, 2_000);
        assert_eq!(config.max_restarts, 3);
    }
}
