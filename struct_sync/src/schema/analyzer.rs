//! Database schema analyzer
//!
//! Reads table definitions and column metadata through an adapter and turns them
//! into parsed [`TableSchema`]s.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::db::adapter::DatabaseAdapter;
use crate::error::{Error, Result};
use crate::schema::parser::parse_table_schema;
use crate::schema::types::TableSchema;

/// Parsed tables of the source database, shared read-only by every worker
pub type SourceTables = IndexMap<String, Arc<TableSchema>>;

/// Schema analyzer for database schema introspection
pub struct SchemaAnalyzer<'a, A: DatabaseAdapter + ?Sized> {
    adapter: &'a mut A,
}

impl<'a, A: DatabaseAdapter + ?Sized> SchemaAnalyzer<'a, A> {
    /// Create a new schema analyzer
    pub fn new(adapter: &'a mut A) -> Self {
        Self { adapter }
    }

    pub async fn table_names(&mut self) -> Result<Vec<String>> {
        self.adapter.list_tables().await
    }

    /// Unparsed `CREATE TABLE` text, empty when the table does not exist
    pub async fn raw_ddl(&mut self, table: &str) -> Result<String> {
        self.adapter.create_statement(table).await
    }

    /// Parse one table, or `None` when it does not exist in this database
    pub async fn table_schema(&mut self, table: &str) -> Result<Option<TableSchema>> {
        let ddl = self.adapter.create_statement(table).await?;
        self.schema_from_ddl(table, &ddl).await
    }

    /// Parse already fetched DDL and attach the table's column metadata
    pub async fn schema_from_ddl(&mut self, table: &str, ddl: &str) -> Result<Option<TableSchema>> {
        if ddl.trim().is_empty() {
            return Ok(None);
        }

        let mut schema = parse_table_schema(ddl)?;
        let fields = self.adapter.column_metadata(table).await?;
        schema.apply_column_metadata(fields);

        Ok(Some(schema))
    }

    /// Parse every table of the connected database
    pub async fn analyze(&mut self) -> Result<SourceTables> {
        let tables = self.adapter.list_tables().await?;

        let mut schemas = IndexMap::with_capacity(tables.len());
        for table in tables {
            let schema = self.table_schema(&table).await?.ok_or_else(|| {
                Error::ParseError(format!("empty table definition for source table {}", table))
            })?;
            tracing::debug!(table = %table, "parsed source table\n{}", schema);
            schemas.insert(table, Arc::new(schema));
        }

        Ok(schemas)
    }
}
