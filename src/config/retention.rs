//! Retention policy configuration.
//!
//! Exactly one of `min_runs` or `max_days` must be set, either here or on the
//! command line.
//!
//! # Example
//!
//! ```toml
//! [retention]
//! min_runs = 10
//! dry_run = false
//! summary_path = "prune-summary.json"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::retention::RetentionPolicy;

/// Retention rule and run mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Keep this many most recent runs per workflow.
    /// Signed so that negative values are reported as validation errors.
    #[serde(default)]
    pub min_runs: Option<i64>,

    /// Keep runs created within this many days.
    #[serde(default)]
    pub max_days: Option<i64>,

    /// Log what would be deleted without deleting anything.
    /// Default: true
    #[serde(default = "default_true")]
    pub dry_run: bool,

    /// Where the JSON summary record is written.
    /// Default: prune-summary.json
    #[serde(default = "default_summary_path")]
    pub summary_path: PathBuf,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            min_runs: None,
            max_days: None,
            dry_run: true,
            summary_path: default_summary_path(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_summary_path() -> PathBuf {
    PathBuf::from("prune-summary.json")
}

impl RetentionConfig {
    /// Resolve the configured rule into a [`RetentionPolicy`].
    pub fn policy(&self) -> Result<RetentionPolicy, ConfigError> {
        match (self.min_runs, self.max_days) {
            (Some(_), Some(_)) => Err(ConfigError::Validation(
                "min_runs and max_days are mutually exclusive; set only one".into(),
            )),
            (None, None) => Err(ConfigError::Validation(
                "one of min_runs or max_days is required".into(),
            )),
            (Some(n), None) => Ok(RetentionPolicy::KeepLatest(non_negative("min_runs", n)?)),
            (None, Some(days)) => Ok(RetentionPolicy::KeepNewerThan(non_negative(
                "max_days", days,
            )?)),
        }
    }
}

fn non_negative(name: &str, value: i64) -> Result<u32, ConfigError> {
    if value < 0 {
        return Err(ConfigError::Validation(format!(
            "{name} must not be negative (got {value})"
        )));
    }
    u32::try_from(value)
        .map_err(|_| ConfigError::Validation(format!("{name} is too large (got {value})")))
}
