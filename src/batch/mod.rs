//! Batch orchestration
//!
//! Runs reduce + merge for every point on a rayon pool. Output order is
//! input order whatever the scheduling. Throttled points are set aside and
//! retried in later rounds after a backoff, so they never hold a worker
//! while waiting. Any other failure is contained to its point.

mod retry;
mod outcome;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::errors::{ExtractError, ExtractResult};
use crate::record::{FeaturePoint, Record, RecordMerger, Table};
use crate::reducer::PointReducer;
use crate::utils::progress::ProgressTracker;

pub use retry::{AbortHandle, RetryPolicy};
pub use outcome::{BatchOutcome, BatchStatus, PointFailure};

/// Batch-level settings
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Worker threads; 0 lets rayon decide
    pub workers: usize,
    pub retry: RetryPolicy,
    /// Show a progress bar on the terminal
    pub progress: bool,
}

/// Drives the per-point phase over a whole point set
pub struct BatchOrchestrator {
    reducer: PointReducer,
    merger: RecordMerger,
    options: BatchOptions,
    abort: AbortHandle,
}

impl BatchOrchestrator {
    pub fn new(reducer: PointReducer, merger: RecordMerger, options: BatchOptions) -> Self {
        BatchOrchestrator {
            reducer,
            merger,
            options,
            abort: AbortHandle::new(),
        }
    }

    /// Use an existing abort handle instead of a fresh one
    pub fn with_abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    /// Handle that aborts batches run by this orchestrator
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Extract features for every point
    ///
    /// # Errors
    /// Only when the worker pool cannot be created; per-point failures end
    /// up in [`BatchOutcome::failures`].
    pub fn extract_all(&self, points: &[FeaturePoint]) -> ExtractResult<BatchOutcome> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers)
            .build()
            .map_err(|e| ExtractError::GenericError(format!("Cannot start worker pool: {}", e)))?;

        info!("Extracting {} point(s) on {} worker(s)", points.len(), pool.current_num_threads());

        let progress = if self.options.progress {
            Some(ProgressTracker::new(points.len() as u64, "Extracting points"))
        } else {
            None
        };

        let mut slots: Vec<Option<(Record, Option<PointFailure>)>> = (0..points.len()).map(|_| None).collect();
        let mut pending: Vec<usize> = (0..points.len()).collect();
        let mut attempt = 1;

        while !pending.is_empty() {
            let first_round = attempt == 1;
            let attempts: Vec<(usize, Option<Attempt>)> = pool.install(|| {
                pending.par_iter()
                    .map(|&index| {
                        // Only the first round starts points; retries finish started ones
                        if first_round && self.abort.is_aborted() {
                            return (index, None);
                        }
                        let outcome = self.attempt_point(&points[index]);
                        if let (Some(bar), false) = (&progress, matches!(outcome, Attempt::Throttled(_))) {
                            bar.increment(1);
                        }
                        (index, Some(outcome))
                    })
                    .collect()
            });

            let mut throttled = Vec::new();
            for (index, outcome) in attempts {
                let point = &points[index];
                let finished = match outcome {
                    None => continue,
                    Some(Attempt::Extracted(record)) => (record, None),
                    Some(Attempt::Throttled(reason)) if attempt < self.options.retry.max_attempts
                        && !self.abort.is_aborted() => {
                        debug!("Point '{}' throttled on attempt {}: {}", point.id, attempt, reason);
                        throttled.push(index);
                        continue;
                    }
                    Some(Attempt::Throttled(reason)) => {
                        if let Some(bar) = &progress {
                            bar.increment(1);
                        }
                        Self::failure(index, point, format!("{} (gave up after {} attempt(s))", reason, attempt))
                    }
                    Some(Attempt::Failed(cause)) => Self::failure(index, point, cause),
                };
                slots[index] = Some(finished);
            }

            if !throttled.is_empty() {
                let delay = self.options.retry.backoff(attempt);
                debug!("Retrying {} throttled point(s) in {:?}", throttled.len(), delay);
                thread::sleep(delay);
            }
            pending = throttled;
            attempt += 1;
        }

        if let Some(bar) = &progress {
            if self.abort.is_aborted() {
                bar.abandon("Aborted");
            } else {
                bar.finish();
            }
        }

        let mut records = Vec::with_capacity(points.len());
        let mut failures = Vec::new();
        for (record, failure) in slots.into_iter().flatten() {
            records.push(record);
            failures.extend(failure);
        }

        let processed = records.len();
        let status = if processed < points.len() {
            warn!("Batch aborted after {} of {} point(s)", processed, points.len());
            BatchStatus::Aborted { processed }
        } else {
            BatchStatus::Completed
        };

        info!("Batch finished: {} record(s), {} failure(s)", processed, failures.len());

        Ok(BatchOutcome {
            table: Table::new(self.merger.schema().clone(), records),
            failures,
            status,
        })
    }

    fn failure(index: usize, point: &FeaturePoint, cause: String) -> (Record, Option<PointFailure>) {
        warn!("{}", ExtractError::PointExtractionFailure { point_id: point.id.clone(), cause: cause.clone() });
        let failure = PointFailure { index, point_id: point.id.clone(), cause };
        (Record::failed(point.clone()), Some(failure))
    }

    /// Reduce and merge one point once
    fn attempt_point(&self, point: &FeaturePoint) -> Attempt {
        match panic::catch_unwind(AssertUnwindSafe(|| self.reducer.reduce(point))) {
            Ok(Ok(results)) => Attempt::Extracted(self.merger.merge(point, &results)),
            Ok(Err(e)) if e.is_retryable() => Attempt::Throttled(e.to_string()),
            Ok(Err(e)) => Attempt::Failed(e.to_string()),
            Err(payload) => Attempt::Failed(format!("reducer panicked: {}", panic_message(payload.as_ref()))),
        }
    }
}

/// Result of one attempt at a point
enum Attempt {
    Extracted(Record),
    Throttled(String),
    Failed(String),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
