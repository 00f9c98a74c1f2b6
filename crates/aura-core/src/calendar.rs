//! Calendar-day comparisons at UTC granularity. A "day" is the UTC
//! year/month/date triple; time-of-day and local timezones never factor in.

use chrono::{DateTime, NaiveTime, Utc};

/// Truncate a timestamp to UTC midnight of its calendar date.
pub fn normalize_to_utc_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

pub fn is_same_calendar_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}

/// True iff `later` falls on the calendar day immediately after `earlier`.
/// Order-sensitive: callers must pass (earlier, later).
pub fn is_consecutive_day(earlier: DateTime<Utc>, later: DateTime<Utc>) -> bool {
    days_between(earlier, later) == 1
}

/// Whole calendar days from `earlier` to `later`; negative when reversed.
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later.date_naive() - earlier.date_naive()).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_normalize_truncates_to_midnight() {
        let t = utc(2025, 6, 15, 23, 59, 59);
        assert_eq!(normalize_to_utc_day(t), utc(2025, 6, 15, 0, 0, 0));
        assert_eq!(normalize_to_utc_day(utc(2025, 6, 15, 0, 0, 0)), utc(2025, 6, 15, 0, 0, 0));
    }

    #[test]
    fn test_same_calendar_day_ignores_time_of_day() {
        assert!(is_same_calendar_day(
            utc(2025, 6, 15, 0, 0, 0),
            utc(2025, 6, 15, 23, 59, 59)
        ));
        assert!(!is_same_calendar_day(
            utc(2025, 6, 15, 23, 59, 59),
            utc(2025, 6, 16, 0, 0, 0)
        ));
    }

    #[test]
    fn test_consecutive_day() {
        // Any time-of-day on the next calendar date counts
        assert!(is_consecutive_day(
            utc(2025, 6, 15, 23, 59, 59),
            utc(2025, 6, 16, 0, 0, 1)
        ));
        assert!(is_consecutive_day(
            utc(2025, 6, 15, 1, 0, 0),
            utc(2025, 6, 16, 23, 0, 0)
        ));
        // Same day is not consecutive
        assert!(!is_consecutive_day(
            utc(2025, 6, 15, 1, 0, 0),
            utc(2025, 6, 15, 23, 0, 0)
        ));
        // Two days apart is not consecutive
        assert!(!is_consecutive_day(
            utc(2025, 6, 15, 1, 0, 0),
            utc(2025, 6, 17, 1, 0, 0)
        ));
        // Not symmetric
        assert!(!is_consecutive_day(
            utc(2025, 6, 16, 1, 0, 0),
            utc(2025, 6, 15, 1, 0, 0)
        ));
    }

    #[test]
    fn test_consecutive_across_month_and_year_boundaries() {
        assert!(is_consecutive_day(
            utc(2025, 6, 30, 12, 0, 0),
            utc(2025, 7, 1, 8, 0, 0)
        ));
        assert!(is_consecutive_day(
            utc(2025, 12, 31, 23, 0, 0),
            utc(2026, 1, 1, 0, 30, 0)
        ));
    }

    #[test]
    fn test_days_between() {
        assert_eq!(days_between(utc(2025, 6, 15, 23, 0, 0), utc(2025, 6, 18, 1, 0, 0)), 3);
        assert_eq!(days_between(utc(2025, 6, 18, 1, 0, 0), utc(2025, 6, 15, 23, 0, 0)), -3);
        assert_eq!(days_between(utc(2025, 6, 15, 0, 0, 0), utc(2025, 6, 15, 23, 59, 59)), 0);
    }
}
