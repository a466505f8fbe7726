//! Partitions fetched runs into active and orphan sets.
//!
//! A run is an orphan when the workflow definition that produced it no longer
//! exists in the repository (the file was deleted or renamed).

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::{RunId, WorkflowId, WorkflowRun};

/// Result of classifying one batch of runs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Runs whose workflow is still defined, ordered by workflow id.
    pub active: Vec<WorkflowRun>,
    /// Runs whose workflow no longer exists, ordered by workflow id.
    pub orphan: Vec<WorkflowRun>,
    /// Distinct workflow ids seen only on orphan runs.
    pub orphan_workflow_ids: BTreeSet<WorkflowId>,
}

impl Classification {
    /// Total number of runs across both partitions.
    pub fn total(&self) -> usize {
        self.active.len() + self.orphan.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Split `all_runs` by membership of their workflow id in `active_workflow_ids`.
///
/// If the same run id appears more than once, the last occurrence replaces the
/// earlier one. Both outputs are stably sorted by workflow id, so runs of one
/// workflow keep their fetch order.
pub fn classify(
    all_runs: &[WorkflowRun],
    active_workflow_ids: &HashSet<WorkflowId>,
) -> Classification {
    let mut last_seen: HashMap<RunId, usize> = HashMap::with_capacity(all_runs.len());
    for (index, run) in all_runs.iter().enumerate() {
        last_seen.insert(run.run_id, index);
    }

    let mut classification = Classification::default();
    for (index, run) in all_runs.iter().enumerate() {
        if last_seen.get(&run.run_id) != Some(&index) {
            continue;
        }
        if active_workflow_ids.contains(&run.workflow_id) {
            classification.active.push(run.clone());
        } else {
            classification.orphan_workflow_ids.insert(run.workflow_id);
            classification.orphan.push(run.clone());
        }
    }

    // `sort_by_key` is stable: ties keep fetch order.
    classification.active.sort_by_key(|run| run.workflow_id);
    classification.orphan.sort_by_key(|run| run.workflow_id);

    tracing::debug!(
        total = classification.total(),
        active = classification.active.len(),
        orphan = classification.orphan.len(),
        orphan_workflows = classification.orphan_workflow_ids.len(),
        "Classified workflow runs"
    );

    classification
}
