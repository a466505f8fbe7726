//! Retention policy evaluation.
//!
//! Given one workflow-name group and the active policy, computes which runs
//! are eligible for deletion. Evaluation is pure: the current time is passed
//! in, never read from the system clock.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{RunId, WorkflowRun};

/// The single rule governing which active runs may be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep the `n` most recent runs of each workflow, delete the rest.
    KeepLatest(u32),
    /// Delete runs created more than `days` days ago.
    KeepNewerThan(u32),
}

impl RetentionPolicy {
    /// The `min-runs` value, if this is a keep-latest policy.
    pub fn min_runs(&self) -> Option<u32> {
        match self {
            Self::KeepLatest(n) => Some(*n),
            Self::KeepNewerThan(_) => None,
        }
    }

    /// The `max-days` value, if this is a keep-newer-than policy.
    pub fn max_days(&self) -> Option<u32> {
        match self {
            Self::KeepLatest(_) => None,
            Self::KeepNewerThan(days) => Some(*days),
        }
    }

    /// Runs created strictly before this instant are eligible under
    /// `KeepNewerThan`.
    ///
    /// `None` when the cutoff falls before the earliest representable
    /// instant, in which case no run is old enough.
    pub fn cutoff(days: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_sub_signed(Duration::try_days(i64::from(days))?)
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepLatest(n) => write!(f, "keep latest {n} runs per workflow"),
            Self::KeepNewerThan(days) => write!(f, "keep runs newer than {days} days"),
        }
    }
}

/// Deletion selection for one workflow-name group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPlan {
    /// Number of active runs in the group before deletion.
    pub group_size: usize,
    /// Runs to delete, ascending by id.
    pub run_ids: Vec<RunId>,
}

/// Per-group deletion plan for the active runs of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    pub groups: BTreeMap<String, GroupPlan>,
}

impl DeletionPlan {
    /// Total number of runs selected for deletion across all groups.
    pub fn delete_count(&self) -> usize {
        self.groups.values().map(|g| g.run_ids.len()).sum()
    }

    /// All selected ids, group by group in name order.
    pub fn run_ids(&self) -> Vec<RunId> {
        self.groups
            .values()
            .flat_map(|g| g.run_ids.iter().copied())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.delete_count() == 0
    }
}

/// Compute the runs of one group to delete under `policy`.
///
/// The result is ascending by run id and is always a subset of `group`.
pub fn plan_group(group: &[WorkflowRun], policy: RetentionPolicy, now: DateTime<Utc>) -> Vec<RunId> {
    match policy {
        RetentionPolicy::KeepLatest(n) => {
            let keep = n as usize;
            if group.len() <= keep {
                return Vec::new();
            }
            // Creation timestamps collide for fan-out runs; ids never do.
            let mut ids: Vec<RunId> = group.iter().map(|run| run.run_id).collect();
            ids.sort_unstable();
            ids.truncate(group.len() - keep);
            ids
        }
        RetentionPolicy::KeepNewerThan(days) => {
            let Some(cutoff) = RetentionPolicy::cutoff(days, now) else {
                return Vec::new();
            };
            let mut ids: Vec<RunId> = group
                .iter()
                .filter(|run| run.created_at < cutoff)
                .map(|run| run.run_id)
                .collect();
            ids.sort_unstable();
            ids
        }
    }
}

/// Group runs by workflow name.
///
/// Several workflow ids may share a name over a repository's history; they
/// are deliberately merged into one group.
pub fn group_by_name(runs: &[WorkflowRun]) -> BTreeMap<String, Vec<WorkflowRun>> {
    let mut groups: BTreeMap<String, Vec<WorkflowRun>> = BTreeMap::new();
    for run in runs {
        groups
            .entry(run.workflow_name.clone())
            .or_default()
            .push(run.clone());
    }
    groups
}

/// Build the deletion plan for a batch of active runs.
pub fn build_plan(
    active_runs: &[WorkflowRun],
    policy: RetentionPolicy,
    now: DateTime<Utc>,
) -> DeletionPlan {
    let groups = group_by_name(active_runs)
        .into_iter()
        .map(|(name, runs)| {
            let run_ids = plan_group(&runs, policy, now);
            tracing::debug!(
                workflow = %name,
                group_size = runs.len(),
                delete = run_ids.len(),
                "Evaluated retention for workflow group"
            );
            (
                name,
                GroupPlan {
                    group_size: runs.len(),
                    run_ids,
                },
            )
        })
        .collect();

    DeletionPlan { groups }
}
