//! Logging utilities for StructSync
//!
//! This module provides logging setup and configuration.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

const DEFAULT_FILE_NAME: &str = "struct_sync_${date}.log";

/// Expand `${date}` and `${time}` in a log file name
pub fn expand_file_name(pattern: &str, now: chrono::DateTime<chrono::Local>) -> String {
    pattern
        .replace("${date}", &now.format("%Y%m%d").to_string())
        .replace("${time}", &now.format("%H%M%S").to_string())
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging based on configuration
pub fn init_logging(config: &Option<LoggingConfig>) -> Result<()> {
    let config = match config {
        Some(cfg) => cfg,
        None => return Ok(()),
    };

    let level = parse_level(&config.level);
    let directive = format!("struct_sync={}", level.as_str().to_lowercase())
        .parse::<Directive>()
        .map_err(|e| Error::ConfigError(format!("Invalid log level: {}", e)))?;
    let env_filter = EnvFilter::from_default_env().add_directive(directive);
    let json = config.format.eq_ignore_ascii_case("json");

    if let Some(dir) = &config.path {
        std::fs::create_dir_all(dir)?;

        let pattern = config.file_name.as_deref().unwrap_or(DEFAULT_FILE_NAME);
        let file_path = Path::new(dir).join(expand_file_name(pattern, chrono::Local::now()));
        let file = OpenOptions::new().create(true).append(true).open(&file_path)?;

        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file));

        if json {
            builder
                .json()
                .try_init()
                .map_err(|e| Error::ConfigError(e.to_string()))?;
        } else {
            builder
                .try_init()
                .map_err(|e| Error::ConfigError(e.to_string()))?;
        }
    } else if config.stdout {
        let builder = fmt::Subscriber::builder().with_env_filter(env_filter);

        if json {
            builder
                .json()
                .try_init()
                .map_err(|e| Error::ConfigError(e.to_string()))?;
        } else {
            builder
                .try_init()
                .map_err(|e| Error::ConfigError(e.to_string()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_expand_file_name() {
        let now = chrono::Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            expand_file_name("StructSync_${date}${time}.log", now),
            "StructSync_20240309070501.log"
        );
        assert_eq!(expand_file_name("fixed.log", now), "fixed.log");
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }
}
