//! # Prelude
//!
//! Commonly used types and traits from webtest-core.

pub use crate::{
    config::{ApiConfig, ConfigLoader, DataConfig, HarnessConfig, LoggingConfig, RetryConfig},
    error::{Error, Result},
    http::{
        HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, SharedTransport, Transport,
        TransportError, WebApiClient,
    },
    telemetry::{init_logging, init_test_logging},
};

pub use serde::{Deserialize, Serialize};
pub use serde_json::{json, Value};
