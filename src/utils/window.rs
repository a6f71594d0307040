//! Request-window helpers for the measurement endpoints.
//!
//! The API counts a "day" from 22:00 UTC of the previous calendar day to
//! 21:59:59 UTC of the day itself (midnight-to-midnight in Finnish local
//! time, ignoring DST drift). Every read shifts its window accordingly so
//! that point `i` of a response lines up with local calendar day `i`.

use chrono::{Datelike, NaiveDate};

/// `begin`/`end` query values for a day-bounded window over local
/// calendar days `start..=end`.
pub fn day_window(start: NaiveDate, end: NaiveDate) -> (String, String) {
    let previous_day = start.pred_opt().unwrap_or(start);
    (
        format!("{}T22:00:00+00:00", previous_day.format("%Y-%m-%d")),
        format!("{}T21:59:59+00:00", end.format("%Y-%m-%d")),
    )
}

/// `begin`/`end` query values covering a full calendar year, using the
/// analogous Dec-31-to-Dec-31 shift.
pub fn year_window(year: i32) -> (String, String) {
    (
        format!("{}-12-31T22:00:00+00:00", year - 1),
        format!("{}-12-31T21:59:59+00:00", year),
    )
}

/// First and last day of the month the given date falls in. Convenience
/// for "this month" requests.
pub fn month_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let last = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    }
    .and_then(|next_first| next_first.pred_opt())
    .unwrap_or(date);
    (first, last)
}
