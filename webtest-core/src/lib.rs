//! # webtest-core
//!
//! Foundation shared by the webtest harness crates:
//!
//! - [`error`]: the harness error taxonomy
//! - [`config`]: layered configuration (defaults, `webtest.toml`, environment)
//! - [`telemetry`]: `tracing` subscriber setup
//! - [`http`]: the HTTP call point ([`Transport`]), a swappable
//!   [`SharedTransport`] handle, the real [`ReqwestTransport`] and the
//!   [`WebApiClient`] exercised by tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use webtest_core::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! let config = ConfigLoader::new().load()?;
//! let transport = SharedTransport::new(ReqwestTransport::new(config.api.timeout())?);
//! let client = WebApiClient::from_config(&config.api, transport);
//!
//! let item = client.get("items/1", &[]).await?;
//! println!("{item}");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod http;
pub mod prelude;
pub mod telemetry;

pub use config::{ConfigLoader, HarnessConfig};
pub use error::{Error, Result};
pub use http::{
    HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, SharedTransport, Transport,
    TransportError, WebApiClient,
};
