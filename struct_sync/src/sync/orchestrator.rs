//! Multi-destination synchronization driver
//!
//! The source structure is loaded once into a [`SyncContext`] and shared
//! read-only. One task per destination compares, groups and executes its own
//! changes on a dedicated connection, then reports a [`SyncOutcome`] over a
//! bounded channel that the driver drains.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::config::{Config, DatabaseConfig, InputMode};
use crate::db::adapter::{Connector, DatabaseAdapter};
use crate::db::executor::SqlExecutor;
use crate::error::{Error, Result};
use crate::schema::analyzer::{SchemaAnalyzer, SourceTables};
use crate::schema::classifier::{classify, AlterKind, AlterPlan};
use crate::schema::diff::TableDiff;
use crate::schema::parser::strip_auto_increment;
use crate::sync::batch::{bucket_script, bucket_statements, Buckets};
use crate::sync::input::read_sql_file;
use crate::sync::outcome::{BucketCounts, SyncOutcome, SyncReport};

/// Run-wide switches
#[derive(Debug, Clone, Default)]
pub struct SyncSettings {
    pub drop_unnecessary: bool,
    pub execute: bool,
    /// Dated directory receiving one SQL file per destination
    pub output_dir: Option<PathBuf>,
    pub channel_capacity: Option<usize>,
}

/// What every destination is synchronized against
#[derive(Debug)]
pub enum SourceInput {
    /// Parsed source tables, diffed per destination
    Tables(SourceTables),
    /// Statements replayed verbatim on every destination
    Statements(Vec<String>),
}

/// State shared read-only by all destination workers
#[derive(Debug)]
pub struct SyncContext {
    pub settings: SyncSettings,
    pub source: SourceInput,
    pub destinations: Vec<DatabaseConfig>,
}

impl SyncContext {
    /// Validate the configuration and load the source once
    pub async fn load<C: Connector + ?Sized>(mut config: Config, connector: &C) -> Result<Self> {
        config.validate()?;
        let output_dir = config.prepare_output_dir()?;

        let source = match config.input_mode() {
            InputMode::Database => {
                let source = config
                    .source
                    .as_ref()
                    .ok_or_else(|| Error::ConfigError("source database missing".to_string()))?;
                SourceInput::Tables(load_source_tables(connector, source).await?)
            }
            InputMode::File => {
                let path = config
                    .sync
                    .input_file
                    .as_ref()
                    .ok_or_else(|| Error::ConfigError("input file missing".to_string()))?;
                SourceInput::Statements(read_sql_file(path)?)
            }
        };

        Ok(Self {
            settings: SyncSettings {
                drop_unnecessary: config.sync.drop_unnecessary,
                execute: config.sync.execute,
                output_dir,
                channel_capacity: config.sync.channel_capacity,
            },
            source,
            destinations: config.destinations,
        })
    }
}

async fn load_source_tables<C: Connector + ?Sized>(
    connector: &C,
    source: &DatabaseConfig,
) -> Result<SourceTables> {
    let mut adapter = connector.connect(source).await?;
    let tables = SchemaAnalyzer::new(&mut adapter).analyze().await;
    if let Err(e) = adapter.close().await {
        tracing::warn!(error = %e, "closing source connection failed");
    }

    let tables = tables?;
    tracing::info!(source = %source.label(), tables = tables.len(), "source structure loaded");
    Ok(tables)
}

/// Drives one synchronization run over every destination
pub struct SyncOrchestrator<C: Connector> {
    context: Arc<SyncContext>,
    connector: Arc<C>,
}

impl<C: Connector> SyncOrchestrator<C> {
    pub fn new(context: SyncContext, connector: C) -> Self {
        Self {
            context: Arc::new(context),
            connector: Arc::new(connector),
        }
    }

    /// Load the source described by `config` and build a driver for it
    pub async fn from_config(config: Config, connector: C) -> Result<Self> {
        let context = SyncContext::load(config, &connector).await?;
        Ok(Self::new(context, connector))
    }

    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    /// Synchronize every destination concurrently and collect one outcome each
    pub async fn run(&self) -> Result<SyncReport> {
        let started = Instant::now();
        let total = self.context.destinations.len();
        let capacity = self.context.settings.channel_capacity.unwrap_or(total).max(1);
        let (tx, mut rx) = mpsc::channel(capacity);

        let mut handles = Vec::with_capacity(total);
        for target in &self.context.destinations {
            let span = tracing::info_span!("sync", destination = %target.label());
            let worker = run_worker(
                Arc::clone(&self.context),
                Arc::clone(&self.connector),
                target.clone(),
                tx.clone(),
            );
            handles.push(tokio::spawn(worker.instrument(span)));
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(total);
        while outcomes.len() < total {
            match rx.recv().await {
                Some(Ok(outcome)) => {
                    tracing::info!(
                        target_id = %outcome.target_id,
                        result = outcome.result.code(),
                        succeeded = outcome.counts.succeeded,
                        failed = outcome.counts.failed,
                        "destination finished"
                    );
                    outcomes.push(outcome);
                }
                Some(Err(e)) => {
                    for handle in &handles {
                        handle.abort();
                    }
                    return Err(e);
                }
                None => break,
            }
        }

        Ok(SyncReport {
            outcomes,
            elapsed_secs: started.elapsed().as_secs_f64(),
        })
    }
}

async fn run_worker<C: Connector>(
    context: Arc<SyncContext>,
    connector: Arc<C>,
    target: DatabaseConfig,
    tx: mpsc::Sender<Result<SyncOutcome>>,
) {
    let started = Instant::now();
    let message = match sync_destination(&context, connector.as_ref(), &target).await {
        Ok(outcome) => Ok(outcome),
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, "fatal error, aborting run");
            Err(e)
        }
        Err(e) => {
            tracing::error!(error = %e, "destination sync failed");
            Ok(SyncOutcome::failed(&target.label(), started.elapsed()))
        }
    };

    if tx.send(message).await.is_err() {
        tracing::warn!("result channel closed before outcome was delivered");
    }
}

/// Synchronize one destination on its own connection
pub async fn sync_destination<C: Connector + ?Sized>(
    context: &SyncContext,
    connector: &C,
    target: &DatabaseConfig,
) -> Result<SyncOutcome> {
    let started = Instant::now();
    let mut adapter = connector.connect(target).await?;
    tracing::info!("Begin Sync...");

    let counts = match &context.source {
        SourceInput::Tables(tables) => {
            diff_destination(&context.settings, tables, &mut adapter, target).await
        }
        SourceInput::Statements(statements) => {
            fill_destination(&context.settings, statements, &mut adapter).await
        }
    };

    if let Err(e) = adapter.close().await {
        tracing::warn!(error = %e, "closing destination connection failed");
    }

    let counts = counts?;
    tracing::info!(
        succeeded = counts.succeeded,
        failed = counts.failed,
        "All sql execute done"
    );

    Ok(SyncOutcome::new(
        &target.label(),
        counts,
        context.settings.execute,
        started.elapsed(),
    ))
}

/// Classify every source table against the destination and group the changes
pub async fn plan_destination<A: DatabaseAdapter + ?Sized>(
    tables: &SourceTables,
    adapter: &mut A,
    drop_unnecessary: bool,
) -> Result<Buckets> {
    let mut buckets = Buckets::new();
    let mut analyzer = SchemaAnalyzer::new(adapter);

    for (table, source) in tables {
        let dest_ddl = analyzer.raw_ddl(table).await?;

        // Skip parsing when only the auto-increment counter differs.
        if strip_auto_increment(dest_ddl.trim()) == source.raw_ddl_normalized {
            tracing::info!(table = %table, "TABLE {} Same", table);
            continue;
        }

        let dest = analyzer.schema_from_ddl(table, &dest_ddl).await?;
        let plan = classify(TableDiff::new(table, Some(Arc::clone(source)), dest), drop_unnecessary);
        if plan.kind == AlterKind::NoChange {
            tracing::info!(table = %table, "TABLE {} Same", table);
            continue;
        }

        tracing::debug!("{}", plan);
        buckets.push(plan);
    }

    if drop_unnecessary {
        match analyzer.table_names().await {
            Ok(dest_tables) => {
                for table in dest_tables.iter().filter(|t| !tables.contains_key(*t)) {
                    let plan = AlterPlan::drop_table(table);
                    tracing::warn!(table = %table, sql = %plan.statement, "[TABLE.DROP]");
                    buckets.push(plan);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "listing destination tables failed, skipping table drops");
            }
        }
    }

    Ok(buckets)
}

async fn diff_destination<A: DatabaseAdapter + ?Sized>(
    settings: &SyncSettings,
    tables: &SourceTables,
    adapter: &mut A,
    target: &DatabaseConfig,
) -> Result<BucketCounts> {
    let buckets = plan_destination(tables, &mut *adapter, settings.drop_unnecessary).await?;
    let mut sql_file = open_sql_file(settings, target).await;
    let mut counts = BucketCounts::default();

    for (key, plans) in buckets.in_execution_order() {
        let statements = bucket_statements(plans);
        let script = bucket_script(&statements);

        if let Some(file) = sql_file.as_mut() {
            if let Err(e) = file.write_all(script.as_bytes()).await {
                tracing::warn!(error = %e, bucket = %key, "writing SQL file failed");
            }
        }

        if settings.execute {
            tracing::info!(bucket = %key, statements = statements.len(), "executing bucket");
            let result = SqlExecutor::new(&mut *adapter)
                .execute_script(&script, &statements)
                .await;
            counts.record(&result);
        }
    }

    if let Some(mut file) = sql_file {
        if let Err(e) = file.flush().await {
            tracing::warn!(error = %e, "flushing SQL file failed");
        }
    }

    Ok(counts)
}

async fn fill_destination<A: DatabaseAdapter + ?Sized>(
    settings: &SyncSettings,
    statements: &[String],
    adapter: &mut A,
) -> Result<BucketCounts> {
    let mut counts = BucketCounts::default();
    if settings.execute {
        let script = statements.join("\n");
        let result = SqlExecutor::new(adapter)
            .execute_script(&script, statements)
            .await;
        counts.record(&result);
    }
    Ok(counts)
}

async fn open_sql_file(settings: &SyncSettings, target: &DatabaseConfig) -> Option<tokio::fs::File> {
    let dir = settings.output_dir.as_ref()?;
    let path = dir.join(target.sql_file_name());

    match tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
    {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Create file failed");
            None
        }
    }
}
