//! Prune GitHub Actions workflow-run history by retention policy.
//!
//! The engine in [`retention`] is platform-agnostic and talks to GitHub only
//! through the [`github::ActionsApi`] trait. [`retention::prune`] is the entry
//! point for one pruning pass.

pub mod config;
pub mod github;
pub mod models;
#[cfg(feature = "cli")]
pub mod observability;
pub mod retention;
