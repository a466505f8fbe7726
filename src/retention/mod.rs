//! Workflow-run retention engine.
//!
//! One pass:
//! 1. Classifies fetched runs as active or orphan ([`classify`])
//! 2. Selects surplus active runs per workflow-name group ([`build_plan`])
//! 3. Deletes orphans, then selected active runs, through a bounded pool
//!    ([`DeletionOrchestrator`])
//! 4. Estimates the API quota the pass costs ([`quota::estimate`])
//!
//! Dry-run mode performs every step except the deletion calls.

mod classifier;
mod error;
mod orchestrator;
mod policy;
pub mod quota;
mod summary;
mod worker;

pub use classifier::{Classification, classify};
pub use error::{RetentionError, RetentionResult};
pub use orchestrator::{
    DEFAULT_CONCURRENCY, DeletionOrchestrator, DeletionReport, PACING_DELAY, PACING_THRESHOLD,
};
pub use policy::{DeletionPlan, GroupPlan, RetentionPolicy, build_plan, group_by_name, plan_group};
pub use quota::QuotaStatus;
pub use summary::{BatchSummary, SummaryRecord};
pub use worker::{BatchOutcome, prune, run_batch};
