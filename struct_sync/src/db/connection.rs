//! MySQL connection handling
//!
//! Each database gets one dedicated `sqlx` connection rather than a pool, so
//! transaction statements issued through it apply to the same session.

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::mysql::{MySqlConnectOptions, MySqlRow};
use sqlx::{ConnectOptions, Connection, Executor, MySqlConnection, Row};
use std::future::Future;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::db::adapter::{Connector, DatabaseAdapter};
use crate::error::{Error, Result};
use crate::schema::types::FieldSchema;

const NO_SUCH_TABLE: &str = "42S02";

/// Opens [`MySqlAdapter`]s
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    default_timeout: Duration,
}

impl MySqlConnector {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    type Adapter = MySqlAdapter;

    async fn connect(&self, target: &DatabaseConfig) -> Result<MySqlAdapter> {
        MySqlAdapter::connect(target, target.timeout(self.default_timeout)).await
    }
}

/// Adapter over a single MySQL connection
#[derive(Debug)]
pub struct MySqlAdapter {
    conn: Option<MySqlConnection>,
    timeout: Duration,
    label: String,
}

impl MySqlAdapter {
    /// Create a new connection from a descriptor
    pub async fn connect(target: &DatabaseConfig, timeout: Duration) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&target.host)
            .port(target.port)
            .username(&target.user)
            .password(&target.password)
            .database(&target.database)
            .charset(&target.charset);

        let conn = tokio::time::timeout(timeout, options.connect())
            .await
            .map_err(|_| {
                Error::ConnectionError(format!("Connect to {} timed out", target.label()))
            })?
            .map_err(|e| Error::ConnectionError(format!("Connect to {} failed: {}", target.label(), e)))?;

        Ok(Self {
            conn: Some(conn),
            timeout,
            label: target.label(),
        })
    }

    fn conn(&mut self) -> Result<&mut MySqlConnection> {
        let label = &self.label;
        self.conn
            .as_mut()
            .ok_or_else(|| Error::ConnectionError(format!("Connection to {} is closed", label)))
    }

    async fn timed<T, F>(timeout: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Timeout(format!(
                "metadata query timed out after {}s",
                timeout.as_secs()
            ))),
        }
    }
}

/// Read a text column that some server versions report as binary
fn text_column(row: &MySqlRow, index: usize) -> Result<Option<String>> {
    match row.try_get::<Option<String>, _>(index) {
        Ok(value) => Ok(value),
        Err(_) => {
            let bytes: Option<Vec<u8>> = row.try_get(index)?;
            Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
        }
    }
}

#[async_trait]
impl DatabaseAdapter for MySqlAdapter {
    async fn list_tables(&mut self) -> Result<Vec<String>> {
        let timeout = self.timeout;
        let conn = self.conn()?;
        let rows = Self::timed(timeout, conn.fetch_all("SHOW TABLES")).await?;

        rows.iter()
            .map(|row| Ok(text_column(row, 0)?.unwrap_or_default()))
            .collect()
    }

    async fn create_statement(&mut self, table: &str) -> Result<String> {
        let timeout = self.timeout;
        let sql = format!("SHOW CREATE TABLE `{}`", table);
        let conn = self.conn()?;

        match Self::timed(timeout, conn.fetch_optional(sql.as_str())).await {
            Ok(Some(row)) => Ok(text_column(&row, 1)?.unwrap_or_default()),
            Ok(None) => Ok(String::new()),
            Err(Error::SqlxError(sqlx::Error::Database(db_err)))
                if db_err.code().as_deref() == Some(NO_SUCH_TABLE) =>
            {
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn column_metadata(&mut self, table: &str) -> Result<IndexMap<String, FieldSchema>> {
        let timeout = self.timeout;
        let sql = format!("SHOW COLUMNS FROM `{}`", table);
        let conn = self.conn()?;
        let rows = Self::timed(timeout, conn.fetch_all(sql.as_str())).await?;

        let mut fields = IndexMap::new();
        for row in &rows {
            // Field, Type, Null, Key, Default, Extra
            let name = text_column(row, 0)?.unwrap_or_default();
            let type_text = text_column(row, 1)?.unwrap_or_default();
            let nullable = text_column(row, 2)?.unwrap_or_default();
            let default = text_column(row, 4)?;

            let field = FieldSchema::from_metadata(&name, &type_text, &nullable, default.as_deref());
            fields.insert(name, field);
        }

        Ok(fields)
    }

    // Generated DDL runs without a deadline. Dropping the future would leave
    // the server applying the statement while the connection is reused.
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let conn = self.conn()?;
        let result = conn.execute(sql).await?;
        Ok(result.rows_affected())
    }

    async fn begin(&mut self) -> Result<()> {
        self.execute("START TRANSACTION").await.map(|_| ())
    }

    async fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT").await.map(|_| ())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK").await.map(|_| ())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        Ok(())
    }
}
