//! Wire types for the GitHub Actions REST API.
//!
//! Only the fields this tool reads are modelled; serde ignores the rest.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    models::{WorkflowDefinition, WorkflowRun, workflow_name_from_path},
    retention::QuotaStatus,
};

/// `GET /repos/{owner}/{repo}/actions/runs`
#[derive(Debug, Deserialize)]
pub struct WorkflowRunsPage {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub workflow_runs: Vec<ApiWorkflowRun>,
}

#[derive(Debug, Deserialize)]
pub struct ApiWorkflowRun {
    pub id: u64,
    pub workflow_id: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<ApiWorkflowRun> for WorkflowRun {
    fn from(run: ApiWorkflowRun) -> Self {
        let name = if run.path.is_empty() {
            run.name.unwrap_or_default()
        } else {
            workflow_name_from_path(&run.path)
        };
        WorkflowRun::new(run.id, run.workflow_id, run.created_at, name)
    }
}

/// `GET /repos/{owner}/{repo}/actions/workflows`
#[derive(Debug, Deserialize)]
pub struct WorkflowsPage {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub workflows: Vec<ApiWorkflow>,
}

#[derive(Debug, Deserialize)]
pub struct ApiWorkflow {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
}

impl From<ApiWorkflow> for WorkflowDefinition {
    fn from(workflow: ApiWorkflow) -> Self {
        WorkflowDefinition {
            id: workflow.id.into(),
            name: workflow.name,
            path: workflow.path,
        }
    }
}

/// `GET /rate_limit`
#[derive(Debug, Deserialize)]
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
pub struct RateLimitResources {
    pub core: RateLimitBucket,
}

#[derive(Debug, Deserialize)]
pub struct RateLimitBucket {
    pub limit: u64,
    pub remaining: u64,
    /// Epoch seconds.
    pub reset: i64,
}

impl RateLimitBucket {
    pub fn into_status(self) -> Option<QuotaStatus> {
        Some(QuotaStatus {
            limit: self.limit,
            remaining: self.remaining,
            reset_at: DateTime::from_timestamp(self.reset, 0)?,
        })
    }
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}
