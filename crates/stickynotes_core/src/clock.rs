//! Wall-clock source for note timestamps.

use chrono::Utc;

/// Current time as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}
