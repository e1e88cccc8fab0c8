use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::config::{columns, ImportConfig};
use crate::error::{ImportError, ProcessingOutcome};
use crate::pipeline::steps::product_chain;
use crate::pipeline::{BatchReport, ProcessingChain};
use crate::registry::ImportRegistry;
use crate::source::open_rows;
use crate::store::Collaborators;
use crate::types::{Row, ValueSource};

/// Result of one import run
#[derive(Debug)]
pub struct ImportReport {
    pub serial: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub workers: usize,
    pub batch: BatchReport,
}

impl ImportReport {
    fn new(serial: Uuid, started_at: DateTime<Utc>, workers: usize, batch: BatchReport) -> Self {
        Self {
            serial,
            started_at,
            finished_at: Utc::now(),
            workers,
            batch,
        }
    }

    pub fn outcome(&self) -> ProcessingOutcome {
        self.batch.outcome()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn log_summary(&self) {
        tracing::info!(
            "Import {} finished in {}ms: {} rows, {} completed, {} skipped, {} failed",
            self.serial,
            self.duration().num_milliseconds(),
            self.batch.rows,
            self.batch.completed,
            self.batch.skipped,
            self.batch.failed()
        );
        tracing::info!(
            "{} entities written, {} unchanged",
            self.batch.writes,
            self.batch.unchanged
        );
        if self.batch.state.has_warnings() {
            tracing::info!("{} rows reported warnings", self.batch.state.get_warnings().len());
        }
        for failure in &self.batch.failures {
            tracing::warn!(
                "Line {} (sku {}) failed in step '{}': {}",
                failure.line,
                failure.sku.as_deref().unwrap_or("<none>"),
                failure.step,
                failure.error
            );
        }
    }
}

/// Runs the product chain over whole inputs.
pub struct Importer {
    registry: Arc<ImportRegistry>,
    chain: Arc<ProcessingChain>,
}

impl Importer {
    pub fn new(config: ImportConfig, collaborators: Collaborators) -> Result<Self, ImportError> {
        let registry = Arc::new(ImportRegistry::new(config)?);
        let chain = product_chain(Arc::clone(&registry), &collaborators);
        tracing::debug!("Product chain: {}", chain.step_names().join(" -> "));
        Ok(Self {
            registry,
            chain: Arc::new(chain),
        })
    }

    pub fn registry(&self) -> &ImportRegistry {
        &self.registry
    }

    /// Import the rows in order on the calling thread
    pub fn import<I>(&self, rows: I) -> Result<ImportReport, ImportError>
    where
        I: IntoIterator<Item = Result<Row, ImportError>>,
    {
        let serial = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!("Starting import {}", serial);

        let batch = self.chain.process_batch(rows)?;
        Ok(ImportReport::new(serial, started_at, 1, batch))
    }

    /// Import the rows on up to `workers` blocking tasks, each running its
    /// own batch over a contiguous range of rows.
    pub async fn import_parallel(
        &self,
        rows: Vec<Row>,
        workers: usize,
    ) -> Result<ImportReport, ImportError> {
        let serial = Uuid::new_v4();
        let started_at = Utc::now();

        let partitions = partition(rows, workers);
        let used_workers = partitions.len().max(1);
        tracing::info!(
            "Starting import {} with {} workers",
            serial,
            used_workers
        );

        let mut tasks = JoinSet::new();
        for (index, partition) in partitions.into_iter().enumerate() {
            let chain = Arc::clone(&self.chain);
            tracing::debug!("Worker {} takes {} rows", index, partition.len());
            tasks.spawn_blocking(move || (index, chain.process_batch(partition.into_iter().map(Ok))));
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined
                .map_err(|e| ImportError::Processing(format!("Import worker failed: {}", e)))?;
            let report = result.map_err(|e| {
                tracing::error!("Worker {} aborted the import: {}", index, e);
                e
            })?;
            results.push((index, report));
        }

        // keep failures in input order
        results.sort_by_key(|(index, _)| *index);
        let mut batch = BatchReport::default();
        for (_, report) in results {
            batch.merge(report);
        }

        Ok(ImportReport::new(serial, started_at, used_workers, batch))
    }

    /// Import a CSV or XLSX file with the configured number of workers
    pub async fn import_file<P: AsRef<Path>>(&self, path: P) -> Result<ImportReport, ImportError> {
        let rows = open_rows(path)?;
        let workers = self.registry.config().workers;
        if workers > 1 {
            let rows = rows.collect::<Result<Vec<_>, _>>()?;
            self.import_parallel(rows, workers).await
        } else {
            self.import(rows)
        }
    }
}

/// Split rows into at most `workers` contiguous ranges without separating
/// consecutive rows of the same SKU.
fn partition(rows: Vec<Row>, workers: usize) -> Vec<Vec<Row>> {
    let chunk_size = rows.len().div_ceil(workers.max(1)).max(1);
    let mut partitions = Vec::new();
    let mut current: Vec<Row> = Vec::new();

    for row in rows {
        let same_sku = current
            .last()
            .is_some_and(|last| last.value(columns::SKU) == row.value(columns::SKU));
        if current.len() >= chunk_size && !same_sku {
            partitions.push(std::mem::take(&mut current));
        }
        current.push(row);
    }
    if !current.is_empty() {
        partitions.push(current);
    }
    partitions
}
