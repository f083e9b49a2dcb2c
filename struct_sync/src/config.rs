//! Configuration handling for StructSync

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 600;

/// Load configuration from a TOML or JSON file, picked by extension
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file {}: {}", path, e)))?;

    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("toml")
        .to_lowercase();

    let config: Config = match extension.as_str() {
        "json" | "conf" => serde_json::from_str(&config_str)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?,
        _ => toml::from_str(&config_str)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?,
    };

    Ok(config)
}

/// Represents the complete StructSync configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub source: Option<DatabaseConfig>,
    #[serde(default)]
    pub destinations: Vec<DatabaseConfig>,
    #[serde(default)]
    pub sync: SyncConfig,
    pub logging: Option<LoggingConfig>,
}

/// Where the reference structure comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Read table definitions from a live source database and diff them
    Database,
    /// Replay the statements of a SQL file against every destination
    File,
}

impl Config {
    /// Check the configuration before any worker runs
    pub fn validate(&self) -> Result<()> {
        match (&self.source, &self.sync.input_file) {
            (Some(_), Some(_)) => {
                return Err(Error::ConfigError(
                    "source database and input file are mutually exclusive".to_string(),
                ))
            }
            (None, None) => {
                return Err(Error::ConfigError(
                    "either a source database or an input file is required".to_string(),
                ))
            }
            _ => {}
        }

        if self.destinations.is_empty() {
            return Err(Error::ConfigError("no destination database configured".to_string()));
        }

        if self.sync.save_sql && self.sync.output_dir.is_none() {
            return Err(Error::ConfigError(
                "save_sql requires an output_dir".to_string(),
            ));
        }

        Ok(())
    }

    pub fn input_mode(&self) -> InputMode {
        if self.sync.input_file.is_some() {
            InputMode::File
        } else {
            InputMode::Database
        }
    }

    /// Timeout applied to a connection that does not carry its own
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    /// Resolve the dated SQL output directory and create it if missing
    pub fn prepare_output_dir(&mut self) -> Result<Option<PathBuf>> {
        if !self.sync.save_sql {
            return Ok(None);
        }

        let base = self
            .sync
            .output_dir
            .as_ref()
            .ok_or_else(|| Error::ConfigError("save_sql requires an output_dir".to_string()))?;

        let dir = Path::new(base).join(chrono::Local::now().format("%Y-%m-%d").to_string());
        fs::create_dir_all(&dir)
            .map_err(|e| Error::ConfigError(format!("Create dir failed, dir = {}: {}", dir.display(), e)))?;

        Ok(Some(dir))
    }
}

/// Database connection descriptor, used for the source and every destination
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    pub timeout_seconds: Option<u64>,
}

fn default_port() -> u16 {
    3306
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

impl DatabaseConfig {
    /// Identity used in logs and outcomes, `<database>@<host>#<port>`
    pub fn label(&self) -> String {
        format!("{}@{}#{}", self.database, self.host, self.port)
    }

    /// File name for persisted SQL, `<database>@<host>#<port>.sql`
    pub fn sql_file_name(&self) -> String {
        format!("{}.sql", self.label())
    }

    pub fn timeout(&self, fallback: Duration) -> Duration {
        self.timeout_seconds.map(Duration::from_secs).unwrap_or(fallback)
    }
}

/// Synchronization behavior
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncConfig {
    pub input_file: Option<String>,
    #[serde(default)]
    pub drop_unnecessary: bool,
    #[serde(default = "default_true")]
    pub execute: bool,
    #[serde(default)]
    pub save_sql: bool,
    pub output_dir: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub channel_capacity: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            input_file: None,
            drop_unnecessary: false,
            execute: true,
            save_sql: false,
            output_dir: None,
            timeout_seconds: None,
            channel_capacity: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub path: Option<String>,
    pub file_name: Option<String>,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub stdout: bool,
}

fn default_format() -> String {
    "text".to_string()
}
