//! Workflow run and workflow definition snapshots.
//!
//! These are plain value types decoupled from the GitHub API payloads in
//! `crate::github::types`. A batch fetches them once and never mutates them.

use std::{fmt, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform-unique identifier of a single workflow run.
///
/// Run ids are assigned monotonically, so ordering by id is ordering by age
/// even when two runs share a creation timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RunId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Identifier of a workflow definition (one `.github/workflows/*.yml` file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(pub u64);

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for WorkflowId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// One execution record of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub run_id: RunId,
    pub workflow_id: WorkflowId,
    pub created_at: DateTime<Utc>,
    /// File stem of the workflow path (`.github/workflows/ci.yml` -> `ci`).
    pub workflow_name: String,
}

impl WorkflowRun {
    pub fn new(
        run_id: impl Into<RunId>,
        workflow_id: impl Into<WorkflowId>,
        created_at: DateTime<Utc>,
        workflow_name: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            workflow_id: workflow_id.into(),
            created_at,
            workflow_name: workflow_name.into(),
        }
    }

    /// Build a run from its workflow file path, deriving the name from the stem.
    pub fn from_path(
        run_id: impl Into<RunId>,
        workflow_id: impl Into<WorkflowId>,
        created_at: DateTime<Utc>,
        path: &str,
    ) -> Self {
        Self::new(run_id, workflow_id, created_at, workflow_name_from_path(path))
    }
}

/// A workflow currently defined in the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: WorkflowId,
    pub name: String,
    pub path: String,
}

/// Derive a workflow name from its file path.
///
/// Falls back to the raw path when it has no usable stem (dynamic workflows
/// such as `dynamic/pages/pages-build-deployment` still get a stable key).
pub fn workflow_name_from_path(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or(path)
        .to_string()
}
