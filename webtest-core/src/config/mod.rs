//! Configuration management for the webtest harness
//!
//! # Examples
//!
//! ```rust,no_run
//! use webtest_core::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .load()
//!     .expect("Failed to load configuration");
//!
//! println!("Testing against {}", config.api.base_url);
//! ```

pub mod loader;
pub mod schema;
pub mod validator;

pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::ConfigValidator;
