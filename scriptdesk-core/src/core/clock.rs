//! Wall-clock timestamps for creation and update bookkeeping.

use chrono::{DateTime, Utc};

/// UTC timestamp; serialized as RFC 3339 (ISO-8601).
pub type Timestamp = DateTime<Utc>;

/// Returns the current wall-clock time.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Returns the value a refreshed `updated_at` should take.
///
/// Never earlier than `previous`, so a wall clock stepping backwards cannot make
/// an entity look older after an edit.
pub fn refreshed(previous: Timestamp) -> Timestamp {
    now().max(previous)
}
