//! Database adapter seam
//!
//! The synchronization engine only talks to databases through these traits, so a
//! destination can be a live MySQL server or an in-memory stand-in.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::schema::types::FieldSchema;

/// One dedicated connection to one database
#[async_trait]
pub trait DatabaseAdapter: Send {
    /// Names of all tables in the connected database
    async fn list_tables(&mut self) -> Result<Vec<String>>;

    /// `CREATE TABLE` text for a table, or an empty string if it does not exist
    async fn create_statement(&mut self, table: &str) -> Result<String>;

    /// Column metadata keyed by column name
    async fn column_metadata(&mut self, table: &str) -> Result<IndexMap<String, FieldSchema>>;

    /// Execute a statement or a multi-statement script, returning rows affected
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    async fn begin(&mut self) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Opens adapters for connection descriptors
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Adapter: DatabaseAdapter + 'static;

    /// Open a dedicated connection. Failure is reported as a connection error.
    async fn connect(&self, target: &DatabaseConfig) -> Result<Self::Adapter>;
}
