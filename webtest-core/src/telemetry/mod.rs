//! Telemetry for the webtest harness.
//!
//! Logging goes through `tracing`; this module only wires a subscriber.

pub mod logging;

pub use logging::{init_logging, init_test_logging};
