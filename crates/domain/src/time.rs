//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for trigger times, template usage and results.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Milliseconds elapsed from `since` to `until`, clamped at zero.
#[must_use]
pub fn elapsed_ms(since: Timestamp, until: Timestamp) -> u64 {
    u64::try_from((until - since).num_milliseconds()).unwrap_or(0)
}
