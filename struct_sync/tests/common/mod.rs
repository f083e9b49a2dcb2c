//! In-memory databases standing in for MySQL servers

#![allow(dead_code)]

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use struct_sync::config::{Config, DatabaseConfig, SyncConfig};
use struct_sync::error::{Error, Result};
use struct_sync::schema::{parse_table_schema, FieldSchema};
use struct_sync::{Connector, DatabaseAdapter};

pub const TABLE_A: &str = "CREATE TABLE `A` (
  `id` int(11) NOT NULL AUTO_INCREMENT,
  `name` varchar(64) NOT NULL DEFAULT '',
  PRIMARY KEY (`id`)
) ENGINE=InnoDB AUTO_INCREMENT=12 DEFAULT CHARSET=utf8mb4";

pub const TABLE_B: &str = "CREATE TABLE `B` (
  `id` int(11) NOT NULL AUTO_INCREMENT,
  `a_id` int(11) NOT NULL,
  PRIMARY KEY (`id`),
  KEY `fk_b_a` (`a_id`),
  CONSTRAINT `fk_b_a` FOREIGN KEY (`a_id`) REFERENCES `A` (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

pub const TABLE_C: &str = "CREATE TABLE `C` (
  `id` int(11) NOT NULL AUTO_INCREMENT,
  `a_id` int(11) NOT NULL,
  PRIMARY KEY (`id`),
  CONSTRAINT `fk_c_a` FOREIGN KEY (`a_id`) REFERENCES `A` (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

/// Contents and failure switches of one in-memory database
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    pub tables: IndexMap<String, String>,
    pub fail_connect: bool,
    pub fail_listing: bool,
    /// Reject any multi-statement script, as a driver without multi-statement support would
    pub reject_scripts: bool,
    /// Statements containing one of these fragments fail
    pub failing: Vec<String>,
}

impl MemoryDatabase {
    pub fn with_tables(tables: &[(&str, &str)]) -> Self {
        Self {
            tables: tables
                .iter()
                .map(|(name, ddl)| (name.to_string(), ddl.to_string()))
                .collect(),
            ..Self::default()
        }
    }
}

pub type ExecutionLog = Arc<Mutex<HashMap<String, Vec<String>>>>;

/// Connector over a set of in-memory databases keyed by `<database>@<host>#<port>`
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    databases: HashMap<String, MemoryDatabase>,
    log: ExecutionLog,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, target: &DatabaseConfig, database: MemoryDatabase) -> Self {
        self.databases.insert(target.label(), database);
        self
    }

    pub fn log(&self) -> ExecutionLog {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Adapter = MemoryAdapter;

    async fn connect(&self, target: &DatabaseConfig) -> Result<MemoryAdapter> {
        let label = target.label();
        let database = self
            .databases
            .get(&label)
            .cloned()
            .ok_or_else(|| Error::ConnectionError(format!("unknown database {}", label)))?;

        if database.fail_connect {
            return Err(Error::ConnectionError(format!("{} refused the connection", label)));
        }

        Ok(MemoryAdapter {
            label,
            database,
            log: Arc::clone(&self.log),
        })
    }
}

pub struct MemoryAdapter {
    label: String,
    database: MemoryDatabase,
    log: ExecutionLog,
}

impl MemoryAdapter {
    fn record(&self, sql: &str) {
        self.log
            .lock()
            .unwrap()
            .entry(self.label.clone())
            .or_default()
            .push(sql.to_string());
    }
}

#[async_trait]
impl DatabaseAdapter for MemoryAdapter {
    async fn list_tables(&mut self) -> Result<Vec<String>> {
        if self.database.fail_listing {
            return Err(Error::ExecutionError("SHOW TABLES failed".to_string()));
        }
        Ok(self.database.tables.keys().cloned().collect())
    }

    async fn create_statement(&mut self, table: &str) -> Result<String> {
        Ok(self.database.tables.get(table).cloned().unwrap_or_default())
    }

    async fn column_metadata(&mut self, table: &str) -> Result<IndexMap<String, FieldSchema>> {
        match self.database.tables.get(table) {
            Some(ddl) => Ok(parse_table_schema(ddl)?.fields),
            None => Ok(IndexMap::new()),
        }
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let is_script = sql.trim().trim_end_matches(';').contains(";\n");
        if is_script && self.database.reject_scripts {
            return Err(Error::ExecutionError("multi statement script rejected".to_string()));
        }
        if self.database.failing.iter().any(|fragment| sql.contains(fragment.as_str())) {
            return Err(Error::ExecutionError(format!("statement failed: {}", sql)));
        }

        self.record(sql);
        Ok(0)
    }

    async fn begin(&mut self) -> Result<()> {
        self.record("START TRANSACTION");
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.record("COMMIT");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.record("ROLLBACK");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn database(host: &str, name: &str) -> DatabaseConfig {
    DatabaseConfig {
        host: host.to_string(),
        port: 3306,
        database: name.to_string(),
        user: "root".to_string(),
        password: String::new(),
        charset: "utf8mb4".to_string(),
        timeout_seconds: None,
    }
}

pub fn source() -> DatabaseConfig {
    database("10.0.0.1", "reference")
}

pub fn db_config(destinations: Vec<DatabaseConfig>) -> Config {
    Config {
        source: Some(source()),
        destinations,
        sync: SyncConfig::default(),
        logging: None,
    }
}

/// Statements executed on one database, in order
pub fn executed(log: &ExecutionLog, target: &DatabaseConfig) -> Vec<String> {
    log.lock()
        .unwrap()
        .get(&target.label())
        .cloned()
        .unwrap_or_default()
}
