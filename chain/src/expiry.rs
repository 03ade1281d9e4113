//! Expiry-date resolution for weekly index options.
//
//  This module is deliberately pure: no clock access, no IO.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};

use crate::underlying::Underlying;

/// On expiry day itself, contracts at/after this hour already belong to the
/// next weekly cycle (market close).
pub const EXPIRY_ROLL_CUTOFF_HOUR: u32 = 15;

/// Nearest weekly expiry on/after `now`.
///
/// Rolls forward one full week when `now` is already the expiry weekday at
/// or past the roll cutoff.
pub fn nearest_expiry(underlying: Underlying, now: NaiveDateTime) -> NaiveDate {
    let today = now.date();
    let target = underlying.expiry_weekday();

    let mut days_ahead = (target.num_days_from_monday() + 7
        - today.weekday().num_days_from_monday())
        % 7;

    if days_ahead == 0 && now.hour() >= EXPIRY_ROLL_CUTOFF_HOUR {
        days_ahead = 7;
    }

    today + Duration::days(i64::from(days_ahead))
}

/// The next `count` weekly expiries, 7 days apart, starting from the
/// (possibly already rolled) nearest expiry.
pub fn upcoming_expiries(underlying: Underlying, now: NaiveDateTime, count: usize) -> Vec<NaiveDate> {
    let mut expiry = nearest_expiry(underlying, now);
    let mut out = Vec::with_capacity(count);

    for _ in 0..count {
        out.push(expiry);
        expiry = expiry + Duration::days(7);
    }

    out
}

/// Whether `expiry` is the last Thursday of its month — the monthly
/// contract, which uses a different symbol encoding than the weeklies.
pub fn is_monthly_expiry(expiry: NaiveDate) -> bool {
    let (next_year, next_month) = if expiry.month() == 12 {
        (expiry.year() + 1, 1)
    } else {
        (expiry.year(), expiry.month() + 1)
    };

    let last_day = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("first of month is always valid")
        - Duration::days(1);

    let days_back = (last_day.weekday().num_days_from_monday() + 7
        - Weekday::Thu.num_days_from_monday())
        % 7;

    expiry == last_day - Duration::days(i64::from(days_back))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: NaiveDate, hour: u32, min: u32) -> NaiveDateTime {
        date.and_hms_opt(hour, min, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn monday_resolves_to_same_week_thursday() {
        // 2026-02-09 is a Monday.
        let expiry = nearest_expiry(Underlying::Nifty, at(d(2026, 2, 9), 10, 0));
        assert_eq!(expiry, d(2026, 2, 12));
    }

    #[test]
    fn friday_resolves_to_next_week_thursday() {
        // 2026-02-13 is a Friday.
        let expiry = nearest_expiry(Underlying::Nifty, at(d(2026, 2, 13), 10, 0));
        assert_eq!(expiry, d(2026, 2, 19));
    }

    #[test]
    fn expiry_day_before_cutoff_keeps_same_day() {
        // 2026-02-12 is a Thursday.
        let expiry = nearest_expiry(Underlying::Nifty, at(d(2026, 2, 12), 14, 59));
        assert_eq!(expiry, d(2026, 2, 12));
    }

    #[test]
    fn expiry_day_at_cutoff_rolls_one_week() {
        let expiry = nearest_expiry(Underlying::BankNifty, at(d(2026, 2, 12), 15, 0));
        assert_eq!(expiry, d(2026, 2, 19));
    }

    #[test]
    fn upcoming_expiries_step_by_seven_days() {
        let expiries = upcoming_expiries(Underlying::Nifty, at(d(2026, 2, 9), 10, 0), 3);
        assert_eq!(expiries, vec![d(2026, 2, 12), d(2026, 2, 19), d(2026, 2, 26)]);
    }

    #[test]
    fn upcoming_expiries_start_from_rolled_date() {
        let expiries = upcoming_expiries(Underlying::Nifty, at(d(2026, 2, 12), 16, 0), 2);
        assert_eq!(expiries, vec![d(2026, 2, 19), d(2026, 2, 26)]);
    }

    #[test]
    fn last_thursday_of_month_is_monthly() {
        assert!(is_monthly_expiry(d(2026, 2, 26)));
        assert!(!is_monthly_expiry(d(2026, 2, 12)));
        assert!(!is_monthly_expiry(d(2026, 2, 19)));
    }

    #[test]
    fn december_wraps_into_next_year() {
        // 2026-12-31 is the last Thursday of December.
        assert!(is_monthly_expiry(d(2026, 12, 31)));
        assert!(!is_monthly_expiry(d(2026, 12, 24)));
    }
}
