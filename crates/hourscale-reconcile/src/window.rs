//! Hour-window evaluation.

use chrono::{DateTime, Timelike, Utc};

/// Whether `now_hour` lies in the inclusive range `[start, end]`.
///
/// The range does not wrap around midnight: with `start > end` no hour is
/// inside. Bounds are not validated here.
pub fn in_window(now_hour: i32, start: i32, end: i32) -> bool {
    start <= now_hour && now_hour <= end
}

/// Hour of day (0-23) of `now` in UTC.
pub fn current_hour(now: DateTime<Utc>) -> i32 {
    now.hour() as i32
}
