//! # Webtest Tests
//!
//! Test harness for web API clients.
//!
//! This crate provides the pieces a client test suite builds on:
//! - JSON-backed fixture data management ([`TestDataManager`])
//! - Network condition simulation with latency and packet loss
//!   ([`NetworkConditionSimulator`])
//! - A scripted mock transport for isolated client tests ([`MockTransport`])
//! - Timing helpers and property-testing strategies
//!
//! ## Usage Examples
//!
//! ### Fixture Data
//!
//! ```rust,no_run
//! use webtest_tests::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! let mut data = TestDataManager::open("test_data.json").await?;
//! let widget = data.create_test_data(json!({"name": "Widget"})).await?;
//!
//! assert_eq!(data.get_test_data("name", "Widget"), Some(&widget));
//! data.clear().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Network Conditions
//!
//! ```rust,no_run
//! use webtest_tests::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! let mock = MockTransport::new();
//! let transport = mock.shared();
//! let client = WebApiClient::new("https://api.example.com", None, transport.clone());
//!
//! let spec = NetworkConditionSpec::new(Duration::from_millis(100), 0.2)?;
//! let outcome = simulate_network_condition(&transport, spec, client.get("items", &[])).await?;
//! if let Err(err) = outcome {
//!     assert!(err.is_connection());
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod data;
pub mod mocks;
pub mod simulators;
pub mod utils;

pub use data::{PersistenceStats, TestDataManager, TestDataRecord};
pub use mocks::MockTransport;
pub use simulators::{
    simulate_network_condition, NetworkConditionGuard, NetworkConditionSimulator, NetworkConditionSpec,
    SimulationStats,
};
pub use utils::{measure_performance, timed, timing::LatencyTimer};

/// Common imports for test modules
pub mod prelude {
    pub use crate::{
        measure_performance, simulate_network_condition, timed, LatencyTimer, MockTransport,
        NetworkConditionGuard, NetworkConditionSimulator, NetworkConditionSpec, SimulationStats,
        TestDataManager, TestDataRecord,
    };

    pub use webtest_core::prelude::*;

    pub use async_trait::async_trait;
    pub use std::sync::Arc;
    pub use std::time::{Duration, Instant};
    pub use tracing::{debug, error, info, warn};
}

/// Testing constants and configuration values
pub mod constants {
    use std::time::Duration;

    /// Identifier field used by fixture collections
    pub const DEFAULT_ID_FIELD: &str = crate::data::DEFAULT_ID_FIELD;

    /// Backing document used when none is configured
    pub const DEFAULT_DATA_FILE: &str = "test_data.json";

    /// Latency used by the slow-network helpers in tests
    pub const DEFAULT_SIMULATED_LATENCY: Duration = Duration::from_millis(100);

    /// Seed for reproducible packet-loss patterns
    pub const DEFAULT_SIMULATION_SEED: u64 = 0x5EED;
}

/// Property testing utilities and strategies
pub mod property_testing {
    use proptest::prelude::*;
    use serde_json::{Map, Value};

    /// Strategy for field names that never collide with the identifier field
    pub fn field_name_strategy() -> impl Strategy<Value = String> {
        prop_oneof!["[a-z]{1,8}", "[a-z]{2,5}_[a-z]{2,5}",]
            .prop_filter("identifier field is reserved", |name| name != "id")
    }

    /// Strategy for JSON scalars stored in fixture fields
    pub fn scalar_strategy() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[A-Za-z0-9 ]{0,16}".prop_map(Value::from),
        ]
    }

    /// Strategy for fixture records without an identifier
    pub fn record_strategy() -> impl Strategy<Value = Value> {
        prop::collection::btree_map(field_name_strategy(), scalar_strategy(), 0..6)
            .prop_map(|fields| Value::Object(fields.into_iter().collect::<Map<String, Value>>()))
    }

    /// Strategy for a batch of fixture records
    pub fn records_strategy(size: std::ops::Range<usize>) -> impl Strategy<Value = Vec<Value>> {
        prop::collection::vec(record_strategy(), size)
    }
}
