//! Ordered processing of rows through a chain of steps.

pub mod steps;

use crate::context::{BatchState, RowContext, RowCounters};
use crate::error::{ImportError, ProcessingOutcome, ProcessingState};
use crate::types::{Row, ValueSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Hand the row to the next step
    Continue,
    /// Nothing left to do for this row; not an error
    SkipRemaining,
}

/// One transformation, validation or persistence unit of a chain.
pub trait ProcessingStep: Send + Sync {
    fn name(&self) -> &'static str;

    fn execute(&self, ctx: &mut RowContext<'_>) -> Result<StepOutcome, ImportError>;
}

/// A row rejected by a row-scoped error
#[derive(Debug)]
pub struct RowFailure {
    pub line: usize,
    pub sku: Option<String>,
    pub step: &'static str,
    pub error: ImportError,
}

#[derive(Debug)]
pub enum RowStatus {
    Completed,
    Skipped { step: &'static str },
    Failed(RowFailure),
}

#[derive(Debug)]
pub struct RowOutcome {
    pub line: usize,
    pub status: RowStatus,
    pub counters: RowCounters,
    pub warnings: Vec<String>,
}

impl RowOutcome {
    fn finish(ctx: RowContext<'_>, status: RowStatus) -> Self {
        let line = ctx.line();
        let (counters, warnings) = ctx.finish();
        Self {
            line,
            status,
            counters,
            warnings,
        }
    }
}

/// Aggregated result of running a chain over a range of rows
#[derive(Debug, Default)]
pub struct BatchReport {
    pub rows: usize,
    pub completed: usize,
    pub skipped: usize,
    pub writes: usize,
    pub unchanged: usize,
    pub failures: Vec<RowFailure>,
    pub state: ProcessingState,
}

impl BatchReport {
    pub fn record(&mut self, outcome: RowOutcome) {
        self.rows += 1;
        self.writes += outcome.counters.writes;
        self.unchanged += outcome.counters.unchanged;
        for warning in outcome.warnings {
            self.state
                .add_warning(format!("Row {}: {}", outcome.line, warning), None);
        }
        match outcome.status {
            RowStatus::Completed => self.completed += 1,
            RowStatus::Skipped { step } => {
                self.skipped += 1;
                tracing::debug!("Row {} skipped after step '{}'", outcome.line, step);
            }
            RowStatus::Failed(failure) => {
                self.state.add_error(
                    format!(
                        "Row {} (sku {}) rejected: {}",
                        failure.line,
                        failure.sku.as_deref().unwrap_or("<none>"),
                        failure.error
                    ),
                    Some(failure.step.to_string()),
                );
                self.failures.push(failure);
            }
        }
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.rows += other.rows;
        self.completed += other.completed;
        self.skipped += other.skipped;
        self.writes += other.writes;
        self.unchanged += other.unchanged;
        self.failures.extend(other.failures);
        self.state.merge(other.state);
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn outcome(&self) -> ProcessingOutcome {
        ProcessingOutcome::from_state(self.state.clone())
    }
}

#[derive(Default)]
pub struct ProcessingChain {
    steps: Vec<Box<dyn ProcessingStep>>,
}

impl ProcessingChain {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn with_step<S: ProcessingStep + 'static>(mut self, step: S) -> Self {
        self.push(Box::new(step));
        self
    }

    pub fn push(&mut self, step: Box<dyn ProcessingStep>) {
        self.steps.push(step);
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Run one row through every step. Row-scoped errors end up in the
    /// returned outcome, batch-fatal errors are returned as `Err`.
    pub fn process_row(
        &self,
        row: &Row,
        batch: &mut BatchState,
    ) -> Result<RowOutcome, ImportError> {
        let mut ctx = RowContext::new(row, batch);

        for step in &self.steps {
            match step.execute(&mut ctx) {
                Ok(StepOutcome::Continue) => ctx.complete_step(step.name()),
                Ok(StepOutcome::SkipRemaining) => {
                    ctx.complete_step(step.name());
                    return Ok(RowOutcome::finish(
                        ctx,
                        RowStatus::Skipped { step: step.name() },
                    ));
                }
                Err(error) if error.is_fatal() => {
                    tracing::error!(
                        "Step '{}' failed fatally on row {}: {}",
                        step.name(),
                        row.line(),
                        error
                    );
                    return Err(error);
                }
                Err(error) => {
                    tracing::warn!(
                        "Row {} rejected by step '{}': {}",
                        row.line(),
                        step.name(),
                        error
                    );
                    let failure = RowFailure {
                        line: row.line(),
                        sku: ctx.sku().ok(),
                        step: step.name(),
                        error,
                    };
                    return Ok(RowOutcome::finish(ctx, RowStatus::Failed(failure)));
                }
            }
        }

        Ok(RowOutcome::finish(ctx, RowStatus::Completed))
    }

    /// Run the rows of one range in order, sharing a fresh batch state
    pub fn process_batch<I>(&self, rows: I) -> Result<BatchReport, ImportError>
    where
        I: IntoIterator<Item = Result<Row, ImportError>>,
    {
        let mut batch = BatchState::new();
        let mut report = BatchReport::default();

        for row in rows {
            let row = row?;
            if report.rows > 0 && report.rows % 1000 == 0 {
                tracing::info!("Processed {} rows...", report.rows);
            }
            tracing::debug!(
                "Processing row {} (sku {})",
                row.line(),
                row.value(crate::config::columns::SKU).unwrap_or("")
            );
            let outcome = self.process_row(&row, &mut batch)?;
            report.record(outcome);
        }

        tracing::debug!(
            "Batch finished: {} rows, {} entities, {} writes, {} unchanged, {} failed",
            report.rows,
            batch.len(),
            report.writes,
            report.unchanged,
            report.failed()
        );
        Ok(report)
    }
}
