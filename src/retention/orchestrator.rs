//! Bounded-concurrency execution of run deletions.
//!
//! Each run id moves through `Pending -> Attempting -> {Deleted | Failed}`.
//! A failed deletion is logged and counted but never stops the batch, and is
//! not retried: the next invocation will select the run again.

use std::{future::Future, time::Duration};

use futures::{StreamExt, stream};

use crate::{github::DeleteError, models::RunId};

/// Number of deletions in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Batches at least this large are paced to stay under secondary rate limits.
pub const PACING_THRESHOLD: usize = 100;

/// Pause taken by a worker after each deletion in a paced batch.
pub const PACING_DELAY: Duration = Duration::from_millis(500);

/// Aggregate outcome of one `execute` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeletionReport {
    /// Runs dispatched (or simulated, in dry-run mode).
    pub attempted: usize,
    /// Runs the platform confirmed deleted.
    pub deleted: usize,
    /// Runs whose deletion failed, including `not_found`.
    pub failed: usize,
    /// Subset of `failed` that no longer existed.
    pub not_found: usize,
}

impl DeletionReport {
    fn dry_run(attempted: usize) -> Self {
        Self {
            attempted,
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: &Result<(), DeleteError>) {
        self.attempted += 1;
        match outcome {
            Ok(()) => self.deleted += 1,
            Err(DeleteError::NotFound(_)) => {
                self.failed += 1;
                self.not_found += 1;
            }
            Err(_) => self.failed += 1,
        }
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: DeletionReport) {
        self.attempted += other.attempted;
        self.deleted += other.deleted;
        self.failed += other.failed;
        self.not_found += other.not_found;
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Drives deletions through a fixed-width worker pool.
#[derive(Debug, Clone)]
pub struct DeletionOrchestrator {
    concurrency: usize,
    pacing_threshold: usize,
    pacing_delay: Duration,
}

impl Default for DeletionOrchestrator {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            pacing_threshold: PACING_THRESHOLD,
            pacing_delay: PACING_DELAY,
        }
    }
}

impl DeletionOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[cfg(test)]
    pub(crate) fn with_pacing(mut self, threshold: usize, delay: Duration) -> Self {
        self.pacing_threshold = threshold;
        self.pacing_delay = delay;
        self
    }

    /// Delete every id in `ids`, or only report them when `dry_run` is set.
    ///
    /// Ids are dispatched in order; completions may arrive in any order. The
    /// returned report always has `attempted == ids.len()`. `label` tags the
    /// log events (e.g. "orphan", "active").
    pub async fn execute<F, Fut>(
        &self,
        label: &str,
        ids: &[RunId],
        dry_run: bool,
        delete: F,
    ) -> DeletionReport
    where
        F: Fn(RunId) -> Fut,
        Fut: Future<Output = Result<(), DeleteError>>,
    {
        if ids.is_empty() {
            return DeletionReport::default();
        }

        if dry_run {
            tracing::info!(
                phase = label,
                count = ids.len(),
                run_ids = ?ids,
                "DRY RUN: would delete workflow runs"
            );
            return DeletionReport::dry_run(ids.len());
        }

        let pacing = (ids.len() >= self.pacing_threshold).then_some(self.pacing_delay);
        tracing::info!(
            phase = label,
            count = ids.len(),
            concurrency = self.concurrency,
            pacing_ms = pacing.map(|d| d.as_millis() as u64).unwrap_or(0),
            "Deleting workflow runs"
        );

        let delete = &delete;
        let report = stream::iter(ids.iter().copied())
            .map(|run_id| async move {
                tracing::debug!(phase = label, run_id = %run_id, "Attempting deletion");
                let outcome = delete(run_id).await;
                match &outcome {
                    Ok(()) => {
                        tracing::info!(phase = label, run_id = %run_id, "Workflow run deleted");
                    }
                    Err(e) => {
                        tracing::warn!(
                            phase = label,
                            run_id = %run_id,
                            kind = e.kind(),
                            error = %e,
                            "Failed to delete workflow run"
                        );
                    }
                }
                if let Some(delay) = pacing
                    && !delay.is_zero()
                {
                    tokio::time::sleep(delay).await;
                }
                outcome
            })
            .buffer_unordered(self.concurrency)
            .fold(DeletionReport::default(), |mut report, outcome| async move {
                report.record(&outcome);
                report
            })
            .await;

        tracing::info!(
            phase = label,
            attempted = report.attempted,
            deleted = report.deleted,
            failed = report.failed,
            not_found = report.not_found,
            "Deletion phase complete"
        );

        report
    }
}
