// Time helpers shared by the engine and any report consumer.
use crate::models::TimeFrame;
use chrono::{DateTime, Duration, Utc};

/// Start of a backfill window of `days` days.
///
/// The window is anchored on the granularity boundary that follows `now`
/// (whole seconds since the epoch), so the first bucket of the window lines up
/// with the grid. Returns `None` when the result falls outside chrono's range.
pub fn aligned_window_start(now: DateTime<Utc>, granularity: TimeFrame, days: u32) -> Option<DateTime<Utc>> {
    let secs = now.timestamp();
    let step = granularity.as_seconds();
    let next_boundary = secs - secs.rem_euclid(step) + step;
    let anchor = DateTime::from_timestamp(next_boundary, 0)?;
    anchor.checked_sub_signed(Duration::days(i64::from(days)))
}
