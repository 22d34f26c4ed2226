//! Bounded-concurrency extraction: one task per object, W at a time.

use std::any::Any;
use std::fmt;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, info_span, warn, Instrument};

use crate::coerce::coerce_records;
use crate::error::{Error, ErrorKind, Result};
use crate::fetch::{Fetched, RowFetcher};
use crate::schema::ObjectSpec;
use crate::writer::{write_table, OutputLayout};

/// Terminal state of one object's task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded { row_count: usize },
    Failed { reason: String },
}

/// What happened to one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub object_name: String,
    pub status: TaskStatus,
}

impl TaskOutcome {
    pub fn succeeded(object_name: impl Into<String>, row_count: usize) -> Self {
        Self {
            object_name: object_name.into(),
            status: TaskStatus::Succeeded { row_count },
        }
    }

    pub fn failed(object_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            status: TaskStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Succeeded { .. })
    }

    /// Rows written, or `None` if the task failed.
    pub fn row_count(&self) -> Option<usize> {
        match self.status {
            TaskStatus::Succeeded { row_count } => Some(row_count),
            TaskStatus::Failed { .. } => None,
        }
    }
}

/// Totals over a run's outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub total_rows: usize,
    pub failed_objects: Vec<String>,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[TaskOutcome]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut summary, outcome| {
                match outcome.status {
                    TaskStatus::Succeeded { row_count } => {
                        summary.succeeded += 1;
                        summary.total_rows += row_count;
                    }
                    TaskStatus::Failed { .. } => {
                        summary.failed += 1;
                        summary.failed_objects.push(outcome.object_name.clone());
                    }
                }
                summary
            })
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} rows",
            self.succeeded, self.failed, self.total_rows
        )
    }
}

/// Runs fetch → coerce → write for every object under a worker budget.
///
/// Tasks are admitted in input order; at most `workers` run at once.
/// A failure or panic in one task becomes that task's [`TaskOutcome`] and
/// never reaches the others. There is no timeout and no retry.
#[derive(Debug)]
pub struct ExtractionPipeline<F> {
    fetcher: Arc<F>,
    layout: OutputLayout,
    workers: NonZeroUsize,
}

impl<F: RowFetcher> ExtractionPipeline<F> {
    pub fn new(fetcher: Arc<F>, layout: OutputLayout, workers: NonZeroUsize) -> Self {
        Self {
            fetcher,
            layout,
            workers,
        }
    }

    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Run one task per spec and wait for all of them.
    ///
    /// Output directories must already exist (see [`OutputLayout::prepare`]).
    /// Outcomes come back in completion order. The only error is a failure
    /// of the dispatcher itself.
    pub async fn run(&self, specs: Vec<ObjectSpec>) -> Result<Vec<TaskOutcome>> {
        let permits = Arc::new(Semaphore::new(self.workers.get()));
        let mut tasks = JoinSet::new();
        let submitted = specs.len();

        for spec in specs {
            let permit = permits.clone().acquire_owned().await.map_err(|e| {
                Error::with_source(ErrorKind::Dispatch(format!("semaphore closed: {e}")), e)
            })?;

            let fetcher = Arc::clone(&self.fetcher);
            let layout = self.layout.clone();
            let span = info_span!("object", name = %spec.name);

            tasks.spawn(
                async move {
                    let _permit = permit;
                    let object_name = spec.name.clone();
                    let started = Instant::now();

                    let result = AssertUnwindSafe(run_task(fetcher.as_ref(), &layout, spec))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|payload| {
                            Err(Error::new(ErrorKind::Task(panic_message(payload.as_ref()))))
                        });

                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    match result {
                        Ok(row_count) => {
                            info!(object = %object_name, rows = row_count, elapsed_ms, "Exported object");
                            TaskOutcome::succeeded(object_name, row_count)
                        }
                        Err(e) => {
                            warn!(object = %object_name, error = %e, elapsed_ms, "Export failed");
                            TaskOutcome::failed(object_name, e.to_string())
                        }
                    }
                }
                .instrument(span),
            );
        }

        let mut outcomes = Vec::with_capacity(submitted);
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| {
                Error::with_source(ErrorKind::Dispatch(format!("task join failed: {e}")), e)
            })?;
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

async fn run_task<F: RowFetcher>(
    fetcher: &F,
    layout: &OutputLayout,
    spec: ObjectSpec,
) -> Result<usize> {
    spec.validate()?;

    let records = match fetcher.fetch(&spec).await? {
        Fetched::Empty => {
            info!(object = %spec.name, "Query returned no rows, nothing written");
            return Ok(0);
        }
        Fetched::Records(records) => records,
    };

    let layout = layout.clone();
    let written = tokio::task::spawn_blocking(move || {
        let table = coerce_records(&spec, records)?;
        write_table(&layout, &table)
    })
    .await
    .map_err(|e| {
        let message = if e.is_panic() {
            panic_message(e.into_panic().as_ref())
        } else {
            e.to_string()
        };
        Error::new(ErrorKind::Task(message))
    })??;

    Ok(written.rows)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let ok = TaskOutcome::succeeded("Account", 3);
        assert!(ok.is_success());
        assert_eq!(ok.row_count(), Some(3));

        let bad = TaskOutcome::failed("Contact", "boom");
        assert!(!bad.is_success());
        assert_eq!(bad.row_count(), None);
    }

    #[test]
    fn test_run_summary() {
        let outcomes = vec![
            TaskOutcome::succeeded("Account", 3),
            TaskOutcome::failed("Lead", "INVALID_FIELD"),
            TaskOutcome::succeeded("Contact", 0),
        ];
        let summary = RunSummary::from_outcomes(&outcomes);

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total_rows, 3);
        assert_eq!(summary.failed_objects, vec!["Lead".to_string()]);
        assert_eq!(summary.to_string(), "2 succeeded, 1 failed, 3 rows");
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("index out of bounds");
        assert_eq!(panic_message(payload.as_ref()), "panicked: index out of bounds");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bad state"));
        assert_eq!(panic_message(payload.as_ref()), "panicked: bad state");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "panicked");
    }
}
