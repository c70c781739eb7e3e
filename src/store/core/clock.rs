//! Timestamps at the precision the store persists them with.

use chrono::{DateTime, SubsecRound, Utc};

/// Current time truncated to whole milliseconds.
///
/// Persisted timestamps are epoch milliseconds, so every timestamp the store
/// stamps is taken at that precision and survives a save/restore unchanged.
#[must_use]
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
