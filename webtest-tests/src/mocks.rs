//! Mock implementations for testing clients without a network.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;
use webtest_core::http::{HttpRequest, HttpResponse, SharedTransport, Transport, TransportError};

type Outcome = Result<HttpResponse, TransportError>;

#[derive(Debug)]
struct MockState {
    scripted: VecDeque<Outcome>,
    fallback: HttpResponse,
    requests: Vec<HttpRequest>,
}

/// Scripted transport.
///
/// Queued outcomes are returned in FIFO order; once the queue is empty every
/// request gets the fallback response (`200` with an empty body unless set).
/// Clones share the same script and request log, so a test can keep one
/// clone for assertions after handing another to a client.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a mock with an empty script
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                scripted: VecDeque::new(),
                fallback: HttpResponse::new(200),
                requests: Vec::new(),
            })),
        }
    }

    /// Queue a response
    pub fn respond_with(&self, response: HttpResponse) -> &Self {
        self.state.lock().scripted.push_back(Ok(response));
        self
    }

    /// Queue a JSON response
    pub fn respond_json(&self, status: u16, body: &Value) -> &Self {
        self.respond_with(HttpResponse::json_body(status, body))
    }

    /// Queue a transport failure
    pub fn fail_with(&self, error: TransportError) -> &Self {
        self.state.lock().scripted.push_back(Err(error));
        self
    }

    /// Response used once the script is exhausted
    pub fn with_fallback(self, response: HttpResponse) -> Self {
        self.state.lock().fallback = response;
        self
    }

    /// Wrap a clone of this mock in a fresh [`SharedTransport`]
    pub fn shared(&self) -> SharedTransport {
        SharedTransport::new(self.clone())
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().requests.clone()
    }

    /// Most recent request
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.state.lock().requests.last().cloned()
    }

    /// Number of requests received
    pub fn call_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Outcomes still queued
    pub fn remaining(&self) -> usize {
        self.state.lock().scripted.len()
    }

    /// Forget recorded requests and queued outcomes
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.scripted.clear();
        state.requests.clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        trace!(method = %request.method, url = %request.url, "mock request");

        let mut state = self.state.lock();
        state.requests.push(request);
        match state.scripted.pop_front() {
            Some(outcome) => outcome,
            None => Ok(state.fallback.clone()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
