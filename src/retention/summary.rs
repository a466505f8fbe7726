//! Batch summary and its persisted record.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    error::{RetentionError, RetentionResult},
    policy::RetentionPolicy,
    quota::{self, QuotaStatus},
    worker::BatchOutcome,
};

/// Aggregate result of one pruning pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub policy: RetentionPolicy,
    pub dry_run: bool,
    /// Orphan runs attempted (or simulated in dry-run mode).
    pub orphan_deleted_count: u64,
    /// Active runs attempted (or simulated in dry-run mode).
    pub active_deleted_count: u64,
    /// Attempted deletions the platform rejected.
    pub failed_count: u64,
    pub quota_limit: u64,
    pub quota_remaining: u64,
    pub quota_reset_at: DateTime<Utc>,
    pub quota_estimate: u64,
}

impl BatchSummary {
    pub fn new(
        policy: RetentionPolicy,
        dry_run: bool,
        outcome: &BatchOutcome,
        quota: QuotaStatus,
    ) -> Self {
        Self {
            policy,
            dry_run,
            orphan_deleted_count: outcome.orphan.attempted as u64,
            active_deleted_count: outcome.active.attempted as u64,
            failed_count: (outcome.orphan.failed + outcome.active.failed) as u64,
            quota_limit: quota.limit,
            quota_remaining: quota.remaining,
            quota_reset_at: quota.reset_at,
            quota_estimate: outcome.quota_estimate,
        }
    }

    /// Total runs attempted across both phases.
    pub fn total_deleted(&self) -> u64 {
        self.orphan_deleted_count + self.active_deleted_count
    }

    /// Go/no-go signal: whether the remaining quota covers the estimate.
    pub fn has_quota_headroom(&self) -> bool {
        quota::has_headroom(self.quota_remaining, self.quota_estimate)
    }
}

/// Flat key-value document written once per invocation for downstream tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SummaryRecord {
    pub dry_run: bool,
    pub repo_url: String,
    pub min_runs: Option<u32>,
    pub max_days: Option<u32>,
    pub core_limit_remaining: u64,
    pub core_limit_reset: String,
    pub core_limit_usage_estimate: u64,
    pub delete_active_workflow_runs_count: u64,
    pub delete_orphan_workflow_runs_count: u64,
}

impl SummaryRecord {
    pub fn new(summary: &BatchSummary, repo_url: &str) -> Self {
        Self {
            dry_run: summary.dry_run,
            repo_url: repo_url.to_string(),
            min_runs: summary.policy.min_runs(),
            max_days: summary.policy.max_days(),
            core_limit_remaining: summary.quota_remaining,
            core_limit_reset: summary.quota_reset_at.to_rfc3339(),
            core_limit_usage_estimate: summary.quota_estimate,
            delete_active_workflow_runs_count: summary.active_deleted_count,
            delete_orphan_workflow_runs_count: summary.orphan_deleted_count,
        }
    }

    /// Write the record as pretty-printed JSON, replacing any previous file.
    pub fn write(&self, path: impl AsRef<Path>) -> RetentionResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| RetentionError::SummaryWrite(e, path.to_path_buf()))?;
        tracing::debug!(path = %path.display(), "Wrote summary record");
        Ok(())
    }
}
