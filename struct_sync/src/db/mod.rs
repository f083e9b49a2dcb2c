//! Database module for StructSync
//!
//! This module handles database connections and statement execution.

pub mod adapter;
pub mod connection;
pub mod executor;

// Re-export key types
pub use adapter::{Connector, DatabaseAdapter};
pub use connection::{MySqlAdapter, MySqlConnector};
pub use executor::SqlExecutor;
