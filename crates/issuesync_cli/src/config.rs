//! Configuration file support for issuesync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `ISSUESYNC_`, sections separated by
//!    `__`, e.g. `ISSUESYNC_GITHUB__TOKEN`, `ISSUESYNC_ENGINE__JOB_TIMEOUT_MS`)
//! 3. Config file (./issuesync.toml, then ~/.config/issuesync/config.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/issuesync/issuesync.db`
//! on Linux (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/issuesync/issuesync.db"  # optional, this is the default
//!
//! [github]
//! token = "ghp_..."  # or ISSUESYNC_GITHUB__TOKEN / GITHUB_TOKEN
//! api_url = "https://github.example.com/api/graphql"  # GitHub Enterprise only
//!
//! [engine]
//! default_batch_size = 50
//! job_timeout_ms = 1800000
//! rate_gate_quota = 5
//!
//! [engine.page_retry]
//! max_retries = 3
//! ```

use std::path::{Path, PathBuf};

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use issuesync::EngineConfig;
use serde::Deserialize;

const APP_NAME: &str = "issuesync";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    /// Sync engine tunables.
    pub engine: EngineConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

/// GitHub configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub token: Option<String>,
    /// GraphQL endpoint override.
    pub api_url: Option<String>,
}

impl Config {
    /// Load configuration from the standard locations and the environment.
    ///
    /// Falls back to defaults (with a warning) when the sources cannot be
    /// read or deserialized.
    pub fn load() -> Self {
        let xdg_config = Self::default_config_path();
        let local_config = PathBuf::from(format!("{APP_NAME}.toml"));

        match Self::load_from(xdg_config.as_deref(), Some(&local_config), true) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}", e);
                Config::default()
            }
        }
    }

    /// Layer the given files (later overrides earlier), then optionally the
    /// `ISSUESYNC_` environment.
    fn load_from(
        xdg_config: Option<&Path>,
        local_config: Option<&Path>,
        with_env: bool,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = ConfigBuilder::builder();

        for path in [xdg_config, local_config].into_iter().flatten() {
            if path.exists() {
                tracing::debug!("Loading config from {:?}", path);
                builder = builder.add_source(
                    File::from(path.to_path_buf())
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        if with_env {
            builder = builder.add_source(
                Environment::with_prefix("ISSUESYNC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        builder.build()?.try_deserialize::<Config>()
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join(format!("{APP_NAME}.db"));
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// The GitHub token from config, or `GITHUB_TOKEN`.
    #[cfg(feature = "github")]
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/issuesync` or `~/.local/state/issuesync`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn from_toml(content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database.url.is_none());
        assert!(config.github.token.is_none());
        assert!(config.github.api_url.is_none());
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_full_config_parsing() {
        let config = from_toml(
            r#"
            [database]
            url = "sqlite:///tmp/test.db"

            [github]
            token = "ghp_test123"
            api_url = "https://ghe.example.com/api/graphql"

            [engine]
            default_batch_size = 25
            job_timeout_ms = 60000
            rate_gate_quota = 2

            [engine.page_retry]
            max_retries = 5
            "#,
        );

        assert_eq!(
            config.database.url,
            Some("sqlite:///tmp/test.db".to_string())
        );
        assert_eq!(config.github.token, Some("ghp_test123".to_string()));
        assert_eq!(
            config.github.api_url.as_deref(),
            Some("https://ghe.example.com/api/graphql")
        );
        assert_eq!(config.engine.default_batch_size, 25);
        assert_eq!(config.engine.job_timeout_ms, 60_000);
        assert_eq!(config.engine.rate_gate_quota, 2);
        assert_eq!(config.engine.page_retry.max_retries, 5);
        // Unset engine values keep their defaults.
        assert_eq!(config.engine.max_batch_size, 100);
        assert_eq!(
            config.engine.page_retry.min_delay_ms,
            EngineConfig::default().page_retry.min_delay_ms
        );
    }

    #[test]
    fn test_config_unknown_fields_ignored() {
        let config = from_toml(
            r#"
            [github]
            token = "t"
            unknown = "ignored"

            [other]
            value = 1
            "#,
        );
        assert_eq!(config.github.token.as_deref(), Some("t"));
    }

    #[test]
    fn test_database_url_defaults_to_state_dir() {
        let url = Config::default().database_url().expect("default url");
        assert!(url.starts_with("sqlite://"));
        assert!(url.contains("issuesync.db"));
        assert!(url.ends_with("?mode=rwc"));
    }

    #[test]
    fn test_database_url_respects_configured_value() {
        let config = from_toml(
            r#"
            [database]
            url = "postgres://localhost/issuesync"
            "#,
        );
        assert_eq!(
            config.database_url(),
            Some("postgres://localhost/issuesync".to_string())
        );
    }

    #[test]
    fn test_local_file_overrides_xdg_file() {
        let mut xdg = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            xdg,
            "[github]\ntoken = \"from-xdg\"\n[engine]\nrate_gate_quota = 9"
        )
        .unwrap();
        let mut local = tempfile::NamedTempFile::new().unwrap();
        writeln!(local, "[github]\ntoken = \"from-local\"").unwrap();

        let config = Config::load_from(Some(xdg.path()), Some(local.path()), false).unwrap();
        assert_eq!(config.github.token.as_deref(), Some("from-local"));
        assert_eq!(config.engine.rate_gate_quota, 9);
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let config = Config::load_from(
            Some(Path::new("/nonexistent/issuesync/config.toml")),
            None,
            false,
        )
        .unwrap();
        assert!(config.database.url.is_none());
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_default_state_dir() {
        let path = Config::default_state_dir().expect("state dir");
        assert!(path.to_string_lossy().contains("issuesync"));
    }
}
