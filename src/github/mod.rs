//! GitHub Actions platform access.
//!
//! [`ActionsApi`] is the boundary between the retention engine and the
//! platform: listing workflow definitions and runs, deleting a run, and
//! reading the core API quota. [`GitHubClient`] implements it over the REST
//! API; tests substitute in-memory implementations.

mod client;
mod error;
mod repo;
pub mod types;

use async_trait::async_trait;
pub use client::GitHubClient;
pub use error::{DeleteError, GitHubError, GitHubResult};
pub use repo::{InvalidRepoRef, RepoRef};

use crate::{
    models::{RunId, WorkflowDefinition, WorkflowRun},
    retention::QuotaStatus,
};

/// Operations the retention engine needs from the hosting platform.
#[async_trait]
pub trait ActionsApi: Send + Sync {
    /// All workflows currently defined in the repository.
    async fn list_workflows(&self) -> GitHubResult<Vec<WorkflowDefinition>>;

    /// Every workflow run in the repository, across all pages.
    async fn list_runs(&self) -> GitHubResult<Vec<WorkflowRun>>;

    /// Delete one run. Failures are per-item and never fatal.
    async fn delete_run(&self, run_id: RunId) -> Result<(), DeleteError>;

    /// Current core API quota.
    async fn rate_limit(&self) -> GitHubResult<QuotaStatus>;
}
