//! Advisory API-quota estimation for a deletion batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Calls spent on authentication, the repository probe and listing bootstrap.
const FIXED_OVERHEAD_CALLS: u64 = 3;

/// Calls per deleted run: fetch by id, then delete.
const CALLS_PER_DELETION: u64 = 2;

/// Items per listing page.
const PAGE_SIZE: u64 = 100;

/// Only this share of the remaining quota is considered spendable.
const HEADROOM_RATIO: f64 = 0.90;

/// Core API quota as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

/// Worst-case number of API calls needed to delete the given runs.
///
/// Every started page of listed items adds a call, so `estimate(0, 0) == 4`.
pub fn estimate(orphan_count: u64, active_delete_count: u64) -> u64 {
    let total = orphan_count.saturating_add(active_delete_count);
    total
        .saturating_mul(CALLS_PER_DELETION)
        .saturating_add(total / PAGE_SIZE + 1)
        .saturating_add(FIXED_OVERHEAD_CALLS)
}

/// Whether the remaining quota comfortably covers `estimate`.
pub fn has_headroom(remaining: u64, estimate: u64) -> bool {
    remaining as f64 * HEADROOM_RATIO > estimate as f64
}
