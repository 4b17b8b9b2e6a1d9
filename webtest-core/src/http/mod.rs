//! # HTTP Call Point
//!
//! Request/response types and the [`Transport`] abstraction that every HTTP
//! call of the client under test goes through. Swapping the transport behind
//! a [`SharedTransport`] is how network conditions are simulated without
//! touching the client.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{Error, Result};

pub mod client;
pub mod reqwest_transport;
pub mod transport;

pub use client::WebApiClient;
pub use reqwest_transport::ReqwestTransport;
pub use transport::{SharedTransport, Transport};

/// HTTP methods used by the client under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A single outgoing call: method, URL and options
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Request method
    pub method: HttpMethod,
    /// Absolute URL
    pub url: String,
    /// Query string parameters, in order
    pub query: Vec<(String, String)>,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// JSON body
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Create a request without query, headers or body
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Append a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a header, replacing any previous value
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach a JSON body
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Header lookup by exact name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Response returned by a transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Raw body
    pub body: Bytes,
}

impl HttpResponse {
    /// Empty-bodied response with the given status
    pub fn new(status: u16) -> Self {
        Self { status, headers: BTreeMap::new(), body: Bytes::new() }
    }

    /// Response carrying a JSON body
    pub fn json_body(status: u16, body: &Value) -> Self {
        let mut response = Self::new(status);
        response.body = Bytes::from(body.to_string());
        response
            .headers
            .insert("content-type".to_string(), "application/json".to_string());
        response
    }

    /// Set a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`Error::Http`]
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let reason = reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("Unknown Status");
        Err(Error::Http { status: self.status, message: reason.to_string() })
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Decode the body as a JSON value, treating an empty body as `null`
    pub fn json_value(&self) -> Result<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        self.json()
    }
}

/// Failures produced at the call point.
///
/// Simulated packet loss surfaces as [`TransportError::Connection`], the same
/// variant a real refused or reset connection maps to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established or was dropped
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Request did not complete in time
    #[error("Request timed out: {message}")]
    Timeout { message: String },

    /// Request could not be built or sent
    #[error("Request error: {message}")]
    Request { message: String },
}

impl TransportError {
    /// Shorthand for a connection failure
    pub fn connection(message: impl Into<String>) -> Self {
        TransportError::Connection { message: message.into() }
    }

    /// Shorthand for a timeout
    pub fn timeout(message: impl Into<String>) -> Self {
        TransportError::Timeout { message: message.into() }
    }

    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Connection { .. } | TransportError::Timeout { .. })
    }
}
