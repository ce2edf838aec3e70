//! Temporal model for "DD.MM.YYYY" dates and "HH:MM" stop times.
//!
//! Every chronological sort in the planning core goes through this module;
//! comparing raw time strings is wrong as soon as a trip crosses midnight.

use chrono::{Duration, NaiveDate};

/// Local times before this hour belong to the following calendar day
/// (overnight-trip convention).
pub const OVERNIGHT_CUTOFF_HOUR: u32 = 6;

/// Parses "DD.MM.YYYY". Malformed input yields `NaiveDate::MAX` so bad
/// rows sort last, never first.
pub fn parse_german_date(s: &str) -> NaiveDate {
    let mut parts = s.split('.');
    let (day, month, year) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(d), Some(m), Some(y), None) => (d, m, y),
        _ => return NaiveDate::MAX,
    };
    match (day.parse(), month.parse(), year.parse()) {
        (Ok(d), Ok(m), Ok(y)) => NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MAX),
        _ => NaiveDate::MAX,
    }
}

pub fn format_german_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Whole days from `a` to `b`; negative when `b` is earlier.
pub fn days_between(a: &str, b: &str) -> i64 {
    (parse_german_date(b) - parse_german_date(a)).num_days()
}

/// Shifts a "DD.MM.YYYY" string by `days`. Malformed input is returned
/// unchanged.
pub fn add_days(date_str: &str, days: i64) -> String {
    let date = parse_german_date(date_str);
    if date == NaiveDate::MAX {
        return date_str.to_string();
    }
    date.checked_add_signed(Duration::days(days))
        .map_or_else(|| date_str.to_string(), format_german_date)
}

/// Minutes since midnight for "HH:MM"; `None` for empty or malformed times.
pub fn time_minutes(time: &str) -> Option<i32> {
    let mut parts = time.split(':');
    let hours: i32 = parts.next()?.trim().parse().ok()?;
    let minutes: i32 = parts.next()?.trim().parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Sortable variant of [`time_minutes`]: empty or malformed times sort
/// after every real time of day.
pub fn effective_minutes(time: &str) -> i32 {
    time_minutes(time).unwrap_or(i32::MAX)
}

/// True when the hour component is before 06:00; such stops belong to the
/// next calendar day relative to the trip date.
pub fn is_overnight_hour(time: &str) -> bool {
    time.split(':')
        .next()
        .and_then(|h| h.trim().parse::<u32>().ok())
        .is_some_and(|h| h < OVERNIGHT_CUTOFF_HOUR)
}
