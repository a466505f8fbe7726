//! Log subscriber setup for the command-line binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the binary so that embedders keep control of their own logging.

mod tracing_init;

pub use tracing_init::*;
