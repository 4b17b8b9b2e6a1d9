//! Error types for the webtest harness.

use thiserror::Error;

use crate::http::TransportError;

/// Main error type for harness operations.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Invalid configuration value, record shape or simulation parameter
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Lookup found no matching record
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Backing document could not be read, written or parsed
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Failure at the HTTP call point
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration { message: message.into() }
    }

    /// Shorthand for a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Error::Persistence { message: message.into() }
    }

    /// Returns the underlying transport failure, if any.
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Error::Transport(err) => Some(err),
            _ => None,
        }
    }

    /// Whether this error is a connection-level transport failure.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Connection { .. }))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization { message: err.to_string() }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Configuration { message: format!("Invalid TOML: {err}") }
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Serialization { message: err.to_string() }
    }
}
