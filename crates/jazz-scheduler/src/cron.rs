//! Cron schedule utilities.
//!
//! Grooves carry classic 5-field expressions ("MIN HOUR DOM MON DOW"); the
//! `cron` crate grammar wants a leading seconds field, so every entry point
//! normalizes first. 6-field expressions pass through untouched.

use std::str::FromStr;

use chrono::{DateTime, Duration, Timelike, Utc};
// Leading `::` — this module shares the crate's name.
use ::cron::Schedule;

/// Normalize a cron expression for parsing: a 5-field expression gets a
/// seconds field of "0" prepended. Anything else is returned unchanged and
/// left for the caller to accept or reject.
pub fn normalize(schedule: &str) -> String {
    if schedule.split_whitespace().count() == 5 {
        format!("0 {}", schedule.trim())
    } else {
        schedule.to_string()
    }
}

/// Whether a schedule is a parseable 5- or 6-field cron expression.
pub fn is_valid(schedule: &str) -> bool {
    let fields = schedule.split_whitespace().count();
    if fields != 5 && fields != 6 {
        return false;
    }
    Schedule::from_str(&normalize(schedule)).is_ok()
}

/// The most recent firing of `schedule` at or before `now`, or None when the
/// expression does not parse.
pub fn most_recent_firing(schedule: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let parsed = Schedule::from_str(&normalize(schedule)).ok()?;
    // Firings land on whole seconds; anchor one second past `now` so a firing
    // exactly at `now` is still returned (the boundary is inclusive).
    let anchor = now.with_nanosecond(0)? + Duration::seconds(1);
    parsed.after(&anchor).next_back()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_normalize_five_fields() {
        assert_eq!(normalize("0 8 * * *"), "0 0 8 * * *");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("0 8 * * *");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_normalize_leaves_other_counts_alone() {
        assert_eq!(normalize("* * *"), "* * *");
        assert_eq!(normalize("bad"), "bad");
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid("0 6 * * *"));
        assert!(is_valid("*/15 9-17 * * 1-5"));
        assert!(is_valid("0 0 6 * * *"));
    }

    #[test]
    fn test_is_valid_rejects_wrong_field_counts() {
        assert!(!is_valid(""));
        assert!(!is_valid("* * *"));
        assert!(!is_valid("0 0 0 6 * * *"));
    }

    #[test]
    fn test_is_valid_rejects_out_of_range() {
        assert!(!is_valid("60 * * * *"));
        assert!(!is_valid("0 24 * * *"));
        assert!(!is_valid("not a cron"));
    }

    #[test]
    fn test_most_recent_firing_same_day() {
        let now = Utc.with_ymd_and_hms(2026, 2, 3, 8, 0, 0).unwrap();
        let fired = most_recent_firing("0 6 * * *", now).unwrap();
        assert_eq!(fired, Utc.with_ymd_and_hms(2026, 2, 3, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_most_recent_firing_previous_day() {
        let now = Utc.with_ymd_and_hms(2026, 2, 3, 5, 59, 0).unwrap();
        let fired = most_recent_firing("0 6 * * *", now).unwrap();
        assert_eq!(fired, Utc.with_ymd_and_hms(2026, 2, 2, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_most_recent_firing_inclusive_at_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 2, 3, 6, 0, 0).unwrap();
        let fired = most_recent_firing("0 6 * * *", now).unwrap();
        assert_eq!(fired, now);
    }

    #[test]
    fn test_most_recent_firing_unparsable() {
        let now = Utc.with_ymd_and_hms(2026, 2, 3, 8, 0, 0).unwrap();
        assert!(most_recent_firing("bad", now).is_none());
    }
}
