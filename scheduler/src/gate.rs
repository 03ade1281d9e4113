//! Determines whether a scheduled task is allowed to fire at a given
//! wall-clock instant.
//
//  This module is deliberately pure: no async, no IO, no clock access.

use std::time::Duration;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Weekday and inside the configured market window (inclusive bounds).
pub fn market_is_open(now: NaiveDateTime, open: NaiveTime, close: NaiveTime) -> bool {
    if is_weekend(now.date()) {
        return false;
    }
    let t = now.time();
    open <= t && t <= close
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Interval cadence: due when never run, or when the gap has elapsed.
///
/// `last_run` is the last *attempt*, successful or not, so a failing task
/// retries once per interval instead of once per poll.
pub fn cadence_due(last_run: Option<NaiveDateTime>, now: NaiveDateTime, interval: Duration) -> bool {
    match last_run {
        None => true,
        Some(last) => match chrono::Duration::from_std(interval) {
            Ok(gap) => now.signed_duration_since(last) >= gap,
            Err(_) => false,
        },
    }
}

/// Once-daily window trigger: inside [start, end) and not yet succeeded
/// today.
///
/// The last-success *date* is the re-trigger guard, so the exact minute the
/// polling loop happens to observe inside the window does not matter, and a
/// failure earlier in the window is retried on the next poll.
pub fn daily_window_due(
    last_success: Option<NaiveDate>,
    now: NaiveDateTime,
    window: (NaiveTime, NaiveTime),
) -> bool {
    let t = now.time();
    if t < window.0 || t >= window.1 {
        return false;
    }
    last_success != Some(now.date())
}
