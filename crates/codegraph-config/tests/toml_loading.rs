//! Integration tests for TOML configuration loading.
//!
//! Uses figment::Jail for safe, sandboxed env var manipulation.

use codegraph_config::CodegraphConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::{Figment, Jail};

#[test]
fn loads_database_config_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
url = "libsql://test.turso.io"
auth_token = "turso-token"
max_connections = 16
"#,
        )?;

        let config: CodegraphConfig = Figment::from(Serialized::defaults(CodegraphConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.database.url, "libsql://test.turso.io");
        assert_eq!(config.database.auth_token, "turso-token");
        assert_eq!(config.database.max_connections, 16);
        assert!(config.database.is_remote());
        Ok(())
    });
}

#[test]
fn loads_embeddings_config_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[embeddings]
text_model = "CustomTextModel"
code_model = "CustomCodeModel"
mock_mode = true
"#,
        )?;

        let config: CodegraphConfig = Figment::from(Serialized::defaults(CodegraphConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.embeddings.text_model, "CustomTextModel");
        assert_eq!(config.embeddings.code_model, "CustomCodeModel");
        assert!(config.embeddings.mock_mode);
        Ok(())
    });
}

#[test]
fn loads_full_config_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
url = "libsql://db.turso.io"

[cache]
url = "redis://cache.internal:6379"

[stream]
consumer_group = "custom-group"

[general]
default_search_limit = 50
mock_mode = true
"#,
        )?;

        let config: CodegraphConfig = Figment::from(Serialized::defaults(CodegraphConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert!(config.database.is_remote());
        assert_eq!(config.cache.url, "redis://cache.internal:6379");
        assert_eq!(config.stream.consumer_group, "custom-group");
        assert_eq!(config.general.default_search_limit, 50);
        assert!(config.general.mock_mode);
        Ok(())
    });
}

#[test]
fn env_var_overrides_toml() {
    Jail::expect_with(|jail| {
        jail.set_env("CODEGRAPH_DATABASE__URL", "libsql://from-env.turso.io");

        jail.create_file(
            "config.toml",
            r#"
[database]
url = "libsql://from-toml.turso.io"
auth_token = "toml-token"
"#,
        )?;

        let config: CodegraphConfig = Figment::from(Serialized::defaults(CodegraphConfig::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("CODEGRAPH_").split("__"))
            .extract()?;

        assert_eq!(config.database.url, "libsql://from-env.turso.io");
        assert_eq!(config.database.auth_token, "toml-token");
        Ok(())
    });
}

/// Documents the figment gotcha: typo'd env var keys are silently ignored.
#[test]
fn typo_env_var_silently_ignored() {
    Jail::expect_with(|jail| {
        jail.set_env("CODEGRAPH_DATABASE__URLL", "libsql://typo.turso.io");

        let config: CodegraphConfig = Figment::from(Serialized::defaults(CodegraphConfig::default()))
            .merge(Env::prefixed("CODEGRAPH_").split("__"))
            .extract()?;

        assert_eq!(config.database.url, "file:codegraph.db");
        Ok(())
    });
}
