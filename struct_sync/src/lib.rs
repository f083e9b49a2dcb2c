//! StructSync: keeps the table structure of many MySQL databases in line with a
//! reference database
//!
//! The source structure is read once, either from a live database or from a SQL
//! file. Every destination is then compared against it on its own connection, and
//! the resulting statements are grouped, saved and executed concurrently.

pub mod config;
pub mod db;
pub mod error;
pub mod schema;
pub mod sync;
pub mod utils;

// Re-export main types for easier access
pub use config::{Config, DatabaseConfig, InputMode, LoggingConfig, SyncConfig};
pub use db::adapter::{Connector, DatabaseAdapter};
pub use db::connection::{MySqlAdapter, MySqlConnector};
pub use error::{Error, Result};
pub use schema::{classify, AlterKind, AlterPlan, SchemaAnalyzer, TableDiff, TableSchema};
pub use sync::{ResultCode, SyncContext, SyncOrchestrator, SyncOutcome, SyncReport};

/// Load the configuration file and prepare a MySQL-backed synchronization run
pub async fn init(config_path: &str) -> Result<SyncOrchestrator<MySqlConnector>> {
    let config = config::load_from_file(config_path)?;
    let connector = MySqlConnector::new(config.default_timeout());
    SyncOrchestrator::from_config(config, connector).await
}

/// Synchronize every destination of `config` and report one outcome each
pub async fn run(config: Config) -> Result<SyncReport> {
    let connector = MySqlConnector::new(config.default_timeout());
    SyncOrchestrator::from_config(config, connector).await?.run().await
}
