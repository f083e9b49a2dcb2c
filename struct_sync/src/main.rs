//! struct_sync: synchronize MySQL table structure
//!
//! ```bash
//! # Diff every destination against the source database and apply the changes
//! struct_sync -c conf/app.toml
//!
//! # Replay a statement file, keeping the generated SQL without executing it
//! struct_sync -i schema.sql -o out -e false
//! ```

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::time::Instant;

use struct_sync::config::{self, InputMode, LoggingConfig};
use struct_sync::utils::logging::init_logging;

#[derive(Parser)]
#[command(name = "struct_sync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Synchronize MySQL table structure from a reference to many destinations", long_about = None)]
struct Cli {
    /// Configuration file (TOML, or JSON for .json/.conf)
    #[arg(short, long, default_value = "conf/app.toml")]
    config: String,

    /// Read the source structure from this SQL file instead of a database
    #[arg(short, long)]
    input: Option<String>,

    /// Drop columns, indexes and tables missing from the source
    #[arg(short, long)]
    drop_unnecessary: bool,

    /// Save the generated SQL under this directory
    #[arg(short, long)]
    output: Option<String>,

    /// Execute the generated SQL on the destinations
    #[arg(short, long, action = ArgAction::Set)]
    execute: Option<bool>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_from_file(&cli.config)
        .with_context(|| format!("The config file [{}] could not be loaded", cli.config))?;

    if let Some(input) = cli.input {
        config.sync.input_file = Some(input);
        config.source = None;
    }
    if cli.drop_unnecessary {
        config.sync.drop_unnecessary = true;
    }
    if let Some(output) = cli.output {
        config.sync.output_dir = Some(output);
        config.sync.save_sql = true;
    }
    if let Some(execute) = cli.execute {
        config.sync.execute = execute;
    }

    let logging = config.logging.clone().or_else(|| {
        Some(LoggingConfig {
            level: "info".to_string(),
            path: None,
            file_name: None,
            format: "text".to_string(),
            stdout: true,
        })
    });
    init_logging(&logging)?;

    match config.input_mode() {
        InputMode::File => println!("Sync Mode: Use file sync struct"),
        InputMode::Database => println!("Sync Mode: Use database sync struct"),
    }
    println!("Database struct sync begin!");

    let started = Instant::now();
    let report = match struct_sync::run(config).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Database struct sync interrupt! {}", e);
            std::process::exit(1);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for outcome in &report.outcomes {
            println!("{}", outcome);
        }
    }

    println!(
        "Database struct sync finished! Time elapsed: {:.6} s",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
