//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt subscriber. `RUST_LOG` takes precedence
//! over the configured level. Both initialisers can be called repeatedly: only
//! the first successful call per process installs a subscriber.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber described by `config`.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = env_filter(config);
    let result = match config.format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).try_init(),
    };
    result.is_ok()
}

/// Install a subscriber that writes through the test harness' captured output.
pub fn init_test_logging(config: &LoggingConfig) -> bool {
    let filter = env_filter(config);
    let result = match config.format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init(),
        LogFormat::Json => {
            tracing_subscriber::fmt().json().with_env_filter(filter).with_test_writer().try_init()
        },
    };
    result.is_ok()
}
