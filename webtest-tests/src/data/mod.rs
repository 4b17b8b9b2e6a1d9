//! Fixture data management and persistence for web API tests.

pub mod persistence;

pub use persistence::{PersistenceStats, TestDataManager, TestDataRecord, DEFAULT_ID_FIELD};
