//! Web API client used as the system under test.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use super::{HttpMethod, HttpRequest, HttpResponse, SharedTransport, Transport};
use crate::config::{ApiConfig, RetryConfig};
use crate::Result;

/// JSON web API client.
///
/// Every request goes through one [`SharedTransport`]; replacing the
/// transport behind it changes how all subsequent calls reach the network.
#[derive(Debug, Clone)]
pub struct WebApiClient {
    base_url: String,
    api_key: Option<String>,
    headers: BTreeMap<String, String>,
    transport: SharedTransport,
    retry: RetryConfig,
}

impl WebApiClient {
    /// Create a client. Sends `Authorization: Bearer <key>` when a key is given.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, transport: SharedTransport) -> Self {
        let mut headers = BTreeMap::new();
        if let Some(key) = &api_key {
            headers.insert("Authorization".to_string(), format!("Bearer {key}"));
        }

        Self {
            base_url: base_url.into(),
            api_key,
            headers,
            transport,
            retry: RetryConfig::none(),
        }
    }

    /// Create a client from configuration
    pub fn from_config(config: &ApiConfig, transport: SharedTransport) -> Self {
        Self::new(config.base_url.clone(), config.api_key.clone(), transport).with_retry(config.retry)
    }

    /// Retry connection-level failures according to `retry`
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Base URL endpoints are joined onto
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Configured API key
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Headers sent with every request
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Handle to the transport all requests go through
    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }

    /// `GET {base_url}/{endpoint}` with query parameters, returning the JSON body
    pub async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value> {
        let mut request = self.request(HttpMethod::Get, endpoint);
        request.query = params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        self.send(request).await?.json_value()
    }

    /// `POST` a JSON body, returning the JSON response
    pub async fn post(&self, endpoint: &str, data: &Value) -> Result<Value> {
        let request = self.request(HttpMethod::Post, endpoint).with_json(data.clone());
        self.send(request).await?.json_value()
    }

    /// `PUT` a JSON body, returning the JSON response
    pub async fn put(&self, endpoint: &str, data: &Value) -> Result<Value> {
        let request = self.request(HttpMethod::Put, endpoint).with_json(data.clone());
        self.send(request).await?.json_value()
    }

    /// `DELETE`, returning the status code
    pub async fn delete(&self, endpoint: &str) -> Result<u16> {
        let request = self.request(HttpMethod::Delete, endpoint);
        Ok(self.send(request).await?.status)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint.trim_start_matches('/'))
    }

    fn request(&self, method: HttpMethod, endpoint: &str) -> HttpRequest {
        let mut request = HttpRequest::new(method, self.url(endpoint));
        request.headers = self.headers.clone();
        request
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.transport.execute(request.clone()).await {
                Ok(response) => {
                    debug!(
                        method = %request.method,
                        url = %request.url,
                        status = response.status,
                        attempt,
                        "request completed"
                    );
                    return response.error_for_status();
                },
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.backoff_for(attempt);
                    warn!(
                        "{} {} failed ({}), retrying in {:?} (attempt {}/{})",
                        request.method, request.url, err, delay, attempt, max_attempts
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(err) => return Err(err.into()),
            }
        }
    }
}
