//! Database row types — these map directly to SQLite rows.
//! Distinct from aura-types wire models to keep the DB layer independent.

use anyhow::anyhow;
use chrono::{DateTime, NaiveDateTime, Utc};

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: String,
    pub aura_points: i64,
    pub streak: i64,
    pub last_completed_at: Option<String>,
    pub created_at: String,
}

pub struct ChallengeRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub difficulty: String,
    pub points_reward: i64,
    pub created_at: String,
}

#[derive(Debug)]
pub struct CompletionRow {
    pub id: i64,
    pub user_id: i64,
    pub challenge_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub completed_at: String,
}

pub struct FlagRow {
    pub id: i64,
    pub completion_id: i64,
    pub flagged_by_id: i64,
    pub reason: Option<String>,
    pub created_at: String,
}

pub struct LeaderboardRow {
    pub user_id: i64,
    pub name: String,
    pub aura_points: i64,
    pub streak: i64,
}

/// Parse a stored timestamp. Rows written by the orchestrator are RFC 3339;
/// rows from SQLite's datetime('now') default are "YYYY-MM-DD HH:MM:SS"
/// without a timezone, which we treat as UTC.
pub fn parse_utc(s: &str) -> anyhow::Result<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| anyhow!("bad timestamp '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_both_timestamp_formats() {
        let expect = Utc.with_ymd_and_hms(2025, 6, 15, 12, 30, 0).unwrap();
        assert_eq!(parse_utc("2025-06-15T12:30:00+00:00").unwrap(), expect);
        assert_eq!(parse_utc("2025-06-15 12:30:00").unwrap(), expect);
        assert!(parse_utc("not a timestamp").is_err());
    }
}
