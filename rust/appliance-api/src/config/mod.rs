//! Configuration management for the appliance API.
//!
//! Configuration is layered: built-in defaults, an optional
//! `config/appliance-api.{toml,yaml,json}` file (or a file given on the
//! command line), then `APPLIANCE__*` environment variables.
//!
//! ```rust,ignore
//! use appliance_api::config::{AppConfig, ConfigValidator};
//!
//! let config = AppConfig::load(None)?;
//! ConfigValidator::validate(&config)?;
//! ```

pub mod error;
pub mod validator;

pub use error::{ConfigResult, ConfigurationError};
pub use validator::ConfigValidator;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Extraction/matching oracle configuration.
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Device catalog configuration.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Session lifecycle configuration.
    #[serde(default)]
    pub sessions: SessionsConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load and validate configuration.
    ///
    /// `file` overrides the default `config/appliance-api` lookup.
    pub fn load(file: Option<&str>) -> anyhow::Result<Self> {
        let config = Self::load_unchecked(file)?;

        ConfigValidator::validate(&config)
            .map_err(|e| anyhow::anyhow!("Configuration validation failed:\n\n{e}"))?;

        Ok(config)
    }

    /// Load configuration without validation.
    pub fn load_unchecked(file: Option<&str>) -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let file_source = match file {
            Some(path) => config::File::with_name(path).required(true),
            None => config::File::with_name("config/appliance-api").required(false),
        };

        let config = config::Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("oracle.gemini.model", default_gemini_model())?
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix("APPLIANCE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;

        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.is_empty() {
                app_config.oracle.gemini.api_key = Some(key);
            }
        }

        Ok(app_config)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout in seconds. Live oracle calls can be slow.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_timeout() -> u64 {
    300
}

fn default_max_upload_bytes() -> usize {
    32 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Extraction/matching oracle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Directory holding `extraction_node_output.json` and
    /// `matcher_node_output.json`.
    #[serde(default = "default_fixture_dir")]
    pub fixture_dir: PathBuf,
    /// Live Gemini oracle.
    #[serde(default)]
    pub gemini: GeminiConfig,
}

fn default_fixture_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            fixture_dir: default_fixture_dir(),
            gemini: GeminiConfig::default(),
        }
    }
}

/// Gemini API settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key. Live calls are disabled without one.
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// JSON list of canonical device group names offered to the matcher.
    #[serde(default = "default_canonical_groups_path")]
    pub canonical_groups_path: PathBuf,
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_max_output_tokens() -> u32 {
    65_536
}

fn default_canonical_groups_path() -> PathBuf {
    PathBuf::from("data/metadata_geraete_list.json")
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout(),
            canonical_groups_path: default_canonical_groups_path(),
        }
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("canonical_groups_path", &self.canonical_groups_path)
            .finish()
    }
}

/// Device catalog configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// SQLite database file. The in-memory catalog is used when unset.
    pub sqlite_path: Option<PathBuf>,
    /// JSON array of catalog rows loaded into the in-memory catalog.
    pub seed_path: Option<PathBuf>,
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Sessions idle longer than this are reclaimed. Unset keeps sessions for
    /// the process lifetime.
    pub idle_timeout_secs: Option<u64>,
    /// How often the reaper runs.
    #[serde(default = "default_reap_interval")]
    pub reap_interval_secs: u64,
}

fn default_reap_interval() -> u64 {
    60
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: None,
            reap_interval_secs: default_reap_interval(),
        }
    }
}

impl SessionsConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
