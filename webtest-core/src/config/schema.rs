//! Configuration schema definitions for the webtest harness
//!
//! The root [`HarnessConfig`] is assembled in layers: defaults, then an
//! optional `webtest.toml`, then environment variables. Field-level rules are
//! declared with `validator`; cross-field rules live in
//! [`ConfigValidator`](super::ConfigValidator).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Root configuration for a test run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HarnessConfig {
    /// API under test
    #[validate(nested)]
    pub api: ApiConfig,

    /// Fixture data storage
    #[validate(nested)]
    pub data: DataConfig,

    /// Log output
    #[validate(nested)]
    pub logging: LoggingConfig,
}

/// Settings for the web API client under test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint is joined onto
    #[validate(url)]
    pub base_url: String,

    /// Bearer token sent in the `Authorization` header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request timeout in milliseconds
    #[validate(range(min = 1))]
    pub timeout_ms: u64,

    /// Retry behaviour for connection-level failures
    #[validate(nested)]
    pub retry: RetryConfig,
}

/// Retry policy for transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, including the first one
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds
    pub base_delay_ms: u64,
}

/// Where fixture records are persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DataConfig {
    /// Backing JSON document
    pub data_file: PathBuf,

    /// Name of the identifier field in every record
    #[validate(length(min = 1))]
    pub id_field: String,
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `webtest_tests=debug`
    #[validate(length(min = 1))]
    pub level: String,

    /// Output format
    pub format: LogFormat,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable
    Text,
    /// One JSON object per line
    Json,
}

impl ApiConfig {
    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl RetryConfig {
    /// Policy that performs a single attempt
    pub fn none() -> Self {
        Self { max_attempts: 1, base_delay_ms: 0 }
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.example.com".to_string(),
            api_key: None,
            timeout_ms: 30_000,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 1, base_delay_ms: 100 }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("test_data.json"),
            id_field: "id".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Text }
    }
}
