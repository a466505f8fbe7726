use std::path::PathBuf;

use thiserror::Error;

use crate::github::GitHubError;

#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("GitHub API error: {0}")]
    Api(#[from] GitHubError),

    #[error("Failed to write summary {1}: {0}")]
    SummaryWrite(std::io::Error, PathBuf),

    #[error("Failed to serialize summary: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RetentionResult<T> = Result<T, RetentionError>;
