//! Startup validation of the application configuration.

use super::AppConfig;
use super::error::{ConfigResult, ConfigurationError};

/// Checks configuration values and combinations before the server starts.
#[derive(Debug)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire configuration, reporting every problem at once.
    pub fn validate(config: &AppConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();
        Self::validate_server(config, &mut errors);
        Self::validate_oracle(config, &mut errors);
        Self::validate_catalog(config, &mut errors);
        Self::validate_sessions(config, &mut errors);

        match ConfigurationError::collect(errors) {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    fn validate_server(config: &AppConfig, errors: &mut Vec<ConfigurationError>) {
        let server = &config.server;
        if server.port == 0 {
            errors.push(ConfigurationError::invalid(
                "server.port must not be 0",
                "Set APPLIANCE__SERVER__PORT to a free port, e.g. 3001",
            ));
        }
        if server.timeout_secs == 0 {
            errors.push(ConfigurationError::invalid(
                "server.timeout_secs must be greater than 0",
                "Set APPLIANCE__SERVER__TIMEOUT_SECS, e.g. 300",
            ));
        }
        if server.max_upload_bytes == 0 {
            errors.push(ConfigurationError::invalid(
                "server.max_upload_bytes must be greater than 0",
                "Set APPLIANCE__SERVER__MAX_UPLOAD_BYTES, e.g. 33554432",
            ));
        }
    }

    fn validate_oracle(config: &AppConfig, errors: &mut Vec<ConfigurationError>) {
        let oracle = &config.oracle;
        if oracle.fixture_dir.as_os_str().is_empty() {
            errors.push(ConfigurationError::invalid(
                "oracle.fixture_dir is empty",
                "Point APPLIANCE__ORACLE__FIXTURE_DIR at the directory holding the oracle fixtures",
            ));
        }
        let gemini = &oracle.gemini;
        if gemini.model.trim().is_empty() {
            errors.push(ConfigurationError::invalid(
                "oracle.gemini.model is empty",
                "Set APPLIANCE__ORACLE__GEMINI__MODEL, e.g. gemini-2.5-flash",
            ));
        }
        if gemini.api_key.is_some() && gemini.max_output_tokens == 0 {
            errors.push(ConfigurationError::invalid(
                "oracle.gemini.max_output_tokens must be greater than 0",
                "Set APPLIANCE__ORACLE__GEMINI__MAX_OUTPUT_TOKENS, e.g. 65536",
            ));
        }
    }

    fn validate_catalog(config: &AppConfig, errors: &mut Vec<ConfigurationError>) {
        let catalog = &config.catalog;
        if catalog.sqlite_path.is_some() && catalog.seed_path.is_some() {
            errors.push(ConfigurationError::incompatible(
                "catalog.sqlite_path",
                "catalog.seed_path",
                "The seed file only populates the in-memory catalog. \
                Import seed rows into the SQLite database instead, or unset sqlite_path.",
            ));
        }
        if cfg!(not(feature = "sqlite")) && catalog.sqlite_path.is_some() {
            errors.push(ConfigurationError::unsupported(
                "catalog.sqlite_path",
                "The 'sqlite' feature is not enabled in this build",
                "Unset APPLIANCE__CATALOG__SQLITE_PATH to use the in-memory catalog",
            ));
        }
    }

    fn validate_sessions(config: &AppConfig, errors: &mut Vec<ConfigurationError>) {
        let sessions = &config.sessions;
        if sessions.idle_timeout_secs.is_some() && sessions.reap_interval_secs == 0 {
            errors.push(ConfigurationError::invalid(
                "sessions.reap_interval_secs must be greater than 0 when idle_timeout_secs is set",
                "Set APPLIANCE__SESSIONS__REAP_INTERVAL_SECS, e.g. 60",
            ));
        }
        if sessions.idle_timeout_secs == Some(0) {
            errors.push(ConfigurationError::invalid(
                "sessions.idle_timeout_secs must be greater than 0",
                "Unset APPLIANCE__SESSIONS__IDLE_TIMEOUT_SECS to keep sessions until restart",
            ));
        }
    }
}
