use chrono::{DateTime, Utc};

use crate::calendar::{is_consecutive_day, is_same_calendar_day};

/// Streak state transition, given the user's previous completion timestamp
/// and current streak. Kept pure so the transaction machinery around it
/// stays trivially testable:
///
/// - never completed anything → streak starts at 1
/// - already completed something today (UTC) → unchanged; multiple
///   completions on one day never inflate the streak
/// - last completion was yesterday (UTC) → streak + 1
/// - gap of two or more days → reset to 1
pub fn next_streak(last_completed_at: Option<DateTime<Utc>>, streak: u32, now: DateTime<Utc>) -> u32 {
    match last_completed_at {
        None => 1,
        Some(last) if is_same_calendar_day(now, last) => streak,
        Some(last) if is_consecutive_day(last, now) => streak + 1,
        Some(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_first_completion_starts_at_one() {
        let now = utc(2025, 6, 15, 12, 0, 0);
        assert_eq!(next_streak(None, 0, now), 1);
        // prior streak is ignored without a last-completed timestamp
        assert_eq!(next_streak(None, 7, now), 1);
    }

    #[test]
    fn test_same_day_keeps_streak() {
        let now = utc(2025, 6, 15, 20, 0, 0);
        let earlier_today = utc(2025, 6, 15, 8, 0, 0);
        assert_eq!(next_streak(Some(earlier_today), 5, now), 5);
    }

    #[test]
    fn test_consecutive_day_increments() {
        let now = utc(2025, 6, 16, 0, 30, 0);
        let yesterday = utc(2025, 6, 15, 23, 45, 0);
        assert_eq!(next_streak(Some(yesterday), 5, now), 6);
    }

    #[test]
    fn test_gap_resets_to_one() {
        let now = utc(2025, 6, 17, 12, 0, 0);
        let two_days_ago = utc(2025, 6, 15, 12, 0, 0);
        assert_eq!(next_streak(Some(two_days_ago), 10, now), 1);

        let last_month = utc(2025, 5, 1, 12, 0, 0);
        assert_eq!(next_streak(Some(last_month), 30, now), 1);
    }

    #[test]
    fn test_increment_across_year_boundary() {
        let now = utc(2026, 1, 1, 9, 0, 0);
        let new_years_eve = utc(2025, 12, 31, 22, 0, 0);
        assert_eq!(next_streak(Some(new_years_eve), 3, now), 4);
    }
}
