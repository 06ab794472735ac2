use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "SHELF_ENV";
const CONFIG_DIR_ENV: &str = "SHELF_CONFIG_DIR";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub providers: ProviderSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            // Default to repo root `config` directory.
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load configuration from an explicit directory and environment name.
    pub fn load_from(config_dir: &std::path::Path, environment: &str) -> anyhow::Result<Self> {
        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        // `SHELF_SEARCH__MIN_LOCAL_RESULTS=3` maps to `search.min_local_results`.
        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix("SHELF")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // Override environment field with parsed enum variant.
        settings.environment = match environment {
            "local" => Environment::Local,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(anyhow!(
                    "unsupported environment '{}'; expected local/staging/production",
                    other
                ));
            }
        };

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_url")]
    pub url: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    fn default_url() -> String {
        "sqlite://shelf.db?mode=rwc".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Fallback filter directive when `RUST_LOG` is not set
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info,sqlx=warn".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Defaults for catalog search and the external fallback.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    /// Local result count below which enhanced search consults providers
    #[serde(default = "SearchSettings::default_min_local_results")]
    pub min_local_results: u32,
    /// Cap on external results returned by enhanced search
    #[serde(default = "SearchSettings::default_external_limit")]
    pub external_limit: u32,
    #[serde(default = "SearchSettings::default_page_size")]
    pub default_page_size: u32,
}

impl SearchSettings {
    fn default_min_local_results() -> u32 {
        5
    }

    fn default_external_limit() -> u32 {
        10
    }

    fn default_page_size() -> u32 {
        20
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            min_local_results: Self::default_min_local_results(),
            external_limit: Self::default_external_limit(),
            default_page_size: Self::default_page_size(),
        }
    }
}

/// Third-party book metadata providers.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// Per-call ceiling for a single provider request
    #[serde(default = "ProviderSettings::default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "ProviderSettings::default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub open_library: OpenLibrarySettings,
    #[serde(default)]
    pub google_books: GoogleBooksSettings,
}

impl ProviderSettings {
    fn default_timeout_ms() -> u64 {
        5000
    }

    fn default_user_agent() -> String {
        concat!("shelf/", env!("CARGO_PKG_VERSION")).to_string()
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout_ms(),
            user_agent: Self::default_user_agent(),
            open_library: OpenLibrarySettings::default(),
            google_books: GoogleBooksSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenLibrarySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "OpenLibrarySettings::default_base_url")]
    pub base_url: String,
}

impl OpenLibrarySettings {
    fn default_base_url() -> String {
        "https://openlibrary.org".to_string()
    }
}

impl Default for OpenLibrarySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: Self::default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleBooksSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "GoogleBooksSettings::default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl GoogleBooksSettings {
    fn default_base_url() -> String {
        "https://www.googleapis.com/books/v1".to_string()
    }
}

impl Default for GoogleBooksSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: Self::default_base_url(),
            api_key: None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn default_search_threshold_is_five() {
        let settings = Settings::default();
        assert_eq!(settings.search.min_local_results, 5);
        assert_eq!(settings.search.default_page_size, 20);
    }

    #[test]
    fn default_providers_are_enabled_with_timeout() {
        let settings = Settings::default();
        assert!(settings.providers.open_library.enabled);
        assert!(settings.providers.google_books.enabled);
        assert_eq!(settings.providers.timeout_ms, 5000);
        assert!(settings.providers.google_books.api_key.is_none());
    }

    #[test]
    fn load_from_missing_directory_uses_defaults() {
        let dir = std::env::temp_dir().join("shelf-settings-missing-dir");
        let settings = Settings::load_from(&dir, "staging").unwrap();
        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn load_from_rejects_unknown_environment() {
        let dir = std::env::temp_dir().join("shelf-settings-missing-dir");
        assert!(Settings::load_from(&dir, "moon").is_err());
    }
}
