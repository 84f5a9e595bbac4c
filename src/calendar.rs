//! School-calendar arithmetic: weekend stepping, effective-date
//! resolution, and window generation.
//!
//! All functions operate on plain `NaiveDate`/`NaiveDateTime` values.
//! Resolving "now" into the institution's zone happens once, in
//! [`local_now`]; everything downstream is zone-free calendar math.

use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, Timelike, Utc, Weekday};

/// True iff the date falls on a Saturday or Sunday.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The next school day strictly after `date`. Never a weekend, never `date`.
pub fn next_school_day(date: NaiveDate) -> NaiveDate {
    let mut day = date + Days::new(1);
    while is_weekend(day) {
        day = day + Days::new(1);
    }
    day
}

/// The school day strictly before `date`.
pub fn previous_school_day(date: NaiveDate) -> NaiveDate {
    let mut day = date - Days::new(1);
    while is_weekend(day) {
        day = day - Days::new(1);
    }
    day
}

/// First school day at or after `date`.
fn snap_forward(date: NaiveDate) -> NaiveDate {
    if is_weekend(date) {
        next_school_day(date)
    } else {
        date
    }
}

/// Current wall-clock time in the institution's zone, expressed as a
/// naive local timestamp. The zone is a fixed offset from UTC; daylight
/// shifts are an operator concern (see the config docs).
pub fn local_now(utc_offset_minutes: i32) -> NaiveDateTime {
    Utc::now().naive_utc() + Duration::minutes(i64::from(utc_offset_minutes))
}

/// The date the plan considers "current".
///
/// From `cutoff_hour` onward the system refers to the next calendar day.
/// A weekend result advances to the next school day, so a Friday evening
/// resolves to the following Monday.
pub fn effective_date(now: NaiveDateTime, cutoff_hour: u32) -> NaiveDate {
    let mut date = now.date();
    if now.hour() >= cutoff_hour {
        date = date + Days::new(1);
    }
    snap_forward(date)
}

/// [`effective_date`] evaluated against the current wall clock.
pub fn effective_today(utc_offset_minutes: i32, cutoff_hour: u32) -> NaiveDate {
    effective_date(local_now(utc_offset_minutes), cutoff_hour)
}

/// Exactly `count` school days, strictly increasing, all strictly after
/// `start`.
pub fn next_school_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut day = start;
    for _ in 0..count {
        day = next_school_day(day);
        days.push(day);
    }
    days
}

/// Exactly `count` school days strictly before `start`, oldest first.
pub fn previous_school_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut day = start;
    for _ in 0..count {
        day = previous_school_day(day);
        days.push(day);
    }
    days.reverse();
    days
}

/// Exactly `count` school days counting `start` itself as the first
/// (a weekend `start` snaps forward). The inclusive companion to
/// [`next_school_days`].
pub fn school_days_from(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut day = snap_forward(start);
    for _ in 0..count {
        days.push(day);
        day = next_school_day(day);
    }
    days
}

/// The active window around `anchor`: `back` previous school days, the
/// anchor, `forward` next school days, oldest to newest, no duplicates.
/// A weekend anchor snaps forward first.
pub fn window(anchor: NaiveDate, back: usize, forward: usize) -> Vec<NaiveDate> {
    let anchor = snap_forward(anchor);
    let mut dates = previous_school_days(anchor, back);
    dates.push(anchor);
    dates.extend(next_school_days(anchor, forward));
    dates
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, hour: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(hour, 0, 0).unwrap()
    }

    // 2025-01-03 is a Friday, 04/05 the weekend, 06 a Monday.

    #[test]
    fn weekend_detection() {
        assert!(!is_weekend(date(2025, 1, 3)));
        assert!(is_weekend(date(2025, 1, 4)));
        assert!(is_weekend(date(2025, 1, 5)));
        assert!(!is_weekend(date(2025, 1, 6)));
    }

    #[test]
    fn next_school_day_skips_weekend() {
        assert_eq!(next_school_day(date(2025, 1, 3)), date(2025, 1, 6));
        assert_eq!(next_school_day(date(2025, 1, 4)), date(2025, 1, 6));
        assert_eq!(next_school_day(date(2025, 1, 6)), date(2025, 1, 7));
    }

    #[test]
    fn previous_school_day_skips_weekend() {
        assert_eq!(previous_school_day(date(2025, 1, 6)), date(2025, 1, 3));
        assert_eq!(previous_school_day(date(2025, 1, 5)), date(2025, 1, 3));
        assert_eq!(previous_school_day(date(2025, 1, 7)), date(2025, 1, 6));
    }

    #[test]
    fn stepping_never_lands_on_weekend() {
        let mut day = date(2025, 1, 1);
        for _ in 0..30 {
            day = next_school_day(day);
            assert!(!is_weekend(day), "{day} is a weekend");
        }
        for _ in 0..30 {
            day = previous_school_day(day);
            assert!(!is_weekend(day), "{day} is a weekend");
        }
    }

    #[test]
    fn effective_date_before_cutoff_is_today() {
        assert_eq!(effective_date(at(2025, 1, 6, 12), 17), date(2025, 1, 6));
        assert_eq!(effective_date(at(2025, 1, 6, 16), 17), date(2025, 1, 6));
    }

    #[test]
    fn effective_date_at_cutoff_rolls_to_next_day() {
        assert_eq!(effective_date(at(2025, 1, 6, 17), 17), date(2025, 1, 7));
        assert_eq!(effective_date(at(2025, 1, 6, 23), 17), date(2025, 1, 7));
    }

    #[test]
    fn effective_date_friday_evening_is_monday() {
        assert_eq!(effective_date(at(2025, 1, 3, 17), 17), date(2025, 1, 6));
    }

    #[test]
    fn effective_date_weekend_snaps_to_monday() {
        assert_eq!(effective_date(at(2025, 1, 4, 9), 17), date(2025, 1, 6));
        // Sunday evening rolls to Monday directly.
        assert_eq!(effective_date(at(2025, 1, 5, 20), 17), date(2025, 1, 6));
        // Saturday evening: next day is Sunday, snapped to Monday.
        assert_eq!(effective_date(at(2025, 1, 4, 20), 17), date(2025, 1, 6));
    }

    #[test]
    fn next_school_days_strictly_after_start() {
        let days = next_school_days(date(2025, 1, 3), 4);
        assert_eq!(
            days,
            vec![
                date(2025, 1, 6),
                date(2025, 1, 7),
                date(2025, 1, 8),
                date(2025, 1, 9),
            ]
        );
        assert!(days.iter().all(|d| *d > date(2025, 1, 3)));
    }

    #[test]
    fn next_school_days_zero_count_is_empty() {
        assert!(next_school_days(date(2025, 1, 6), 0).is_empty());
    }

    #[test]
    fn next_school_days_are_increasing_and_weekday_only() {
        let days = next_school_days(date(2025, 1, 1), 10);
        assert_eq!(days.len(), 10);
        for pair in days.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(days.iter().all(|d| !is_weekend(*d)));
    }

    #[test]
    fn previous_school_days_oldest_first() {
        let days = previous_school_days(date(2025, 1, 6), 3);
        assert_eq!(
            days,
            vec![date(2025, 1, 1), date(2025, 1, 2), date(2025, 1, 3)]
        );
    }

    #[test]
    fn school_days_from_includes_start() {
        let days = school_days_from(date(2025, 1, 6), 4);
        assert_eq!(
            days,
            vec![
                date(2025, 1, 6),
                date(2025, 1, 7),
                date(2025, 1, 8),
                date(2025, 1, 9),
            ]
        );
    }

    #[test]
    fn school_days_from_weekend_start_snaps_forward() {
        let days = school_days_from(date(2025, 1, 4), 2);
        assert_eq!(days, vec![date(2025, 1, 6), date(2025, 1, 7)]);
    }

    #[test]
    fn window_spans_back_anchor_forward() {
        let dates = window(date(2025, 1, 6), 3, 4);
        assert_eq!(
            dates,
            vec![
                date(2025, 1, 1),
                date(2025, 1, 2),
                date(2025, 1, 3),
                date(2025, 1, 6),
                date(2025, 1, 7),
                date(2025, 1, 8),
                date(2025, 1, 9),
                date(2025, 1, 10),
            ]
        );
    }

    #[test]
    fn window_has_no_duplicates_and_no_weekends() {
        let dates = window(date(2025, 1, 6), 3, 4);
        let unique: std::collections::BTreeSet<_> = dates.iter().collect();
        assert_eq!(unique.len(), dates.len());
        assert!(dates.iter().all(|d| !is_weekend(*d)));
    }

    #[test]
    fn window_weekend_anchor_snaps_forward() {
        let dates = window(date(2025, 1, 4), 1, 1);
        assert_eq!(
            dates,
            vec![date(2025, 1, 3), date(2025, 1, 6), date(2025, 1, 7)]
        );
    }
}
