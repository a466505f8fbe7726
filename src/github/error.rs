use thiserror::Error;

use crate::models::RunId;

/// Fatal GitHub API errors. Any of these aborts the batch.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub token not found (set GH_TOKEN or github.token)")]
    MissingToken,

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Rate limit exceeded (resets at {reset_at})")]
    RateLimited { reset_at: String },

    #[error("Unexpected status {status} from {endpoint}: {message}")]
    UnexpectedStatus {
        status: u16,
        endpoint: String,
        message: String,
    },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

pub type GitHubResult<T> = Result<T, GitHubError>;

/// Per-run deletion failure. Isolated to one run; the batch continues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeleteError {
    #[error("workflow run {0} not found")]
    NotFound(RunId),

    #[error("permission denied deleting workflow run {0}")]
    PermissionDenied(RunId),

    #[error("rate limited while deleting workflow run {0}")]
    RateLimited(RunId),

    #[error("failed to delete workflow run {run_id}: {message}")]
    Other { run_id: RunId, message: String },
}

impl DeleteError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::RateLimited(_) => "rate_limited",
            Self::Other { .. } => "other",
        }
    }
}
