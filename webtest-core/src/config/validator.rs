//! # Configuration Validation
//!
//! Field rules from the schema plus checks `validator` cannot express.

use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use validator::Validate;

use crate::{
    config::schema::{ApiConfig, DataConfig, HarnessConfig, LoggingConfig},
    Error, Result,
};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a configuration
    pub fn validate(config: &HarnessConfig) -> Result<()> {
        debug!("Starting configuration validation");

        config
            .validate()
            .map_err(|e| Error::configuration(format!("Invalid configuration: {e}")))?;

        Self::validate_api_config(&config.api)?;
        Self::validate_data_config(&config.data)?;
        Self::validate_logging_config(&config.logging)?;

        debug!("Configuration validation completed successfully");
        Ok(())
    }

    fn validate_api_config(api: &ApiConfig) -> Result<()> {
        let url = url::Url::parse(&api.base_url)
            .map_err(|e| Error::configuration(format!("Invalid base URL {}: {e}", api.base_url)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::configuration(format!(
                "Base URL must use http or https, got {}",
                url.scheme()
            )));
        }

        if let Some(key) = &api.api_key {
            if key.trim().is_empty() {
                return Err(Error::configuration("API key must not be blank when set"));
            }
        }

        if api.timeout_ms < 100 {
            warn!("Request timeout of {}ms is very short", api.timeout_ms);
        }

        Ok(())
    }

    fn validate_data_config(data: &DataConfig) -> Result<()> {
        if data.data_file.as_os_str().is_empty() {
            return Err(Error::configuration("Data file path must not be empty"));
        }

        if data.data_file.is_dir() {
            return Err(Error::configuration(format!(
                "Data file {} is a directory",
                data.data_file.display()
            )));
        }

        Ok(())
    }

    fn validate_logging_config(logging: &LoggingConfig) -> Result<()> {
        EnvFilter::try_new(&logging.level).map_err(|e| {
            Error::configuration(format!("Invalid log level '{}': {e}", logging.level))
        })?;
        Ok(())
    }
}
