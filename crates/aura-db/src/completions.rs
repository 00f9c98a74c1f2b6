//! The completion transaction: insert the completion row, re-read the user's
//! streak state, apply the streak transition, and credit the points — all in
//! one SQLite transaction. Either every write lands or none do; an orphaned
//! completion row without the matching points/streak update must never be
//! observable.

use chrono::{DateTime, Utc};
use rusqlite::TransactionBehavior;
use thiserror::Error;
use tracing::debug;

use aura_core::streak::next_streak;

use crate::models::{CompletionRow, parse_utc};
use crate::{Database, is_unique_violation};

#[derive(Debug, Error)]
pub enum CompletionTxError {
    /// The (user, challenge) pair already has a completion row. Raised from
    /// the UNIQUE constraint, which stays authoritative even when two
    /// submissions race past the API layer's fast-path check.
    #[error("challenge already completed")]
    AlreadyCompleted,
    /// The user row vanished between authentication and the transaction.
    /// Aborts the whole transaction so the inserted completion rolls back.
    #[error("user does not exist")]
    UserMissing,
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
    #[error("{0}")]
    Internal(String),
}

/// Everything the caller needs to report a successful completion.
#[derive(Debug)]
pub struct CompletionRecord {
    pub completion: CompletionRow,
    pub aura_points: i64,
    pub streak: u32,
}

impl Database {
    pub fn complete_challenge(
        &self,
        user_id: i64,
        challenge_id: i64,
        latitude: f64,
        longitude: f64,
        points_reward: i64,
        now: DateTime<Utc>,
    ) -> Result<CompletionRecord, CompletionTxError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| CompletionTxError::Internal(format!("DB lock poisoned: {}", e)))?;

        // IMMEDIATE takes the write lock up front, so the read-modify-write
        // on the user row cannot interleave with another writer.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let completed_at = now.to_rfc3339();
        tx.execute(
            "INSERT INTO challenge_completions (user_id, challenge_id, latitude, longitude, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![user_id, challenge_id, latitude, longitude, completed_at],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                CompletionTxError::AlreadyCompleted
            } else {
                CompletionTxError::Db(e)
            }
        })?;
        let completion_id = tx.last_insert_rowid();

        let user = tx
            .query_row(
                "SELECT aura_points, streak, last_completed_at FROM users WHERE id = ?1",
                [user_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(CompletionTxError::Db(other)),
            })?;

        // Dropping `tx` without commit rolls the insert back.
        let Some((aura_points, streak, last_completed_at)) = user else {
            return Err(CompletionTxError::UserMissing);
        };

        let last_completed = last_completed_at
            .as_deref()
            .map(parse_utc)
            .transpose()
            .map_err(|e| CompletionTxError::Internal(e.to_string()))?;

        let new_streak = next_streak(last_completed, streak.max(0) as u32, now);
        let new_points = aura_points + points_reward;

        tx.execute(
            "UPDATE users SET aura_points = ?1, streak = ?2, last_completed_at = ?3 WHERE id = ?4",
            rusqlite::params![new_points, i64::from(new_streak), completed_at, user_id],
        )?;

        tx.commit()?;

        debug!(
            "Completion recorded: user={} challenge={} points={} streak={}",
            user_id, challenge_id, new_points, new_streak
        );

        Ok(CompletionRecord {
            completion: CompletionRow {
                id: completion_id,
                user_id,
                challenge_id,
                latitude,
                longitude,
                completed_at,
            },
            aura_points: new_points,
            streak: new_streak,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn seed(db: &Database) -> (i64, i64) {
        let user_id = db
            .create_user("ada@example.com", "Ada", "not-a-real-hash")
            .unwrap();
        let challenge_id = db
            .create_challenge("Hidden mural", "Find the mural", 40.7128, -74.0060, "easy", 50)
            .unwrap();
        (user_id, challenge_id)
    }

    #[test]
    fn test_first_completion_credits_points_and_starts_streak() {
        let db = Database::open_in_memory().unwrap();
        let (user_id, challenge_id) = seed(&db);

        let now = utc(2025, 6, 15, 12, 0, 0);
        let rec = db
            .complete_challenge(user_id, challenge_id, 40.7128, -74.0060, 50, now)
            .unwrap();

        assert_eq!(rec.aura_points, 50);
        assert_eq!(rec.streak, 1);
        assert_eq!(rec.completion.user_id, user_id);
        assert_eq!(rec.completion.challenge_id, challenge_id);

        let user = db.get_user_by_id(user_id).unwrap().unwrap();
        assert_eq!(user.aura_points, 50);
        assert_eq!(user.streak, 1);
        assert_eq!(
            parse_utc(user.last_completed_at.as_deref().unwrap()).unwrap(),
            now
        );
    }

    #[test]
    fn test_duplicate_completion_rejected_without_mutation() {
        let db = Database::open_in_memory().unwrap();
        let (user_id, challenge_id) = seed(&db);

        let now = utc(2025, 6, 15, 12, 0, 0);
        db.complete_challenge(user_id, challenge_id, 40.7128, -74.0060, 50, now)
            .unwrap();

        let err = db
            .complete_challenge(user_id, challenge_id, 40.7128, -74.0060, 50, now)
            .unwrap_err();
        assert!(matches!(err, CompletionTxError::AlreadyCompleted));

        // No second credit
        let user = db.get_user_by_id(user_id).unwrap().unwrap();
        assert_eq!(user.aura_points, 50);
        assert_eq!(user.streak, 1);
    }

    #[test]
    fn test_streak_increments_across_consecutive_days() {
        let db = Database::open_in_memory().unwrap();
        let (user_id, c1) = seed(&db);
        let c2 = db
            .create_challenge("Rooftop view", "Climb up", 40.7138, -74.0060, "medium", 100)
            .unwrap();
        let c3 = db
            .create_challenge("Old bridge", "Cross it", 40.7148, -74.0060, "hard", 200)
            .unwrap();

        let rec = db
            .complete_challenge(user_id, c1, 40.7128, -74.0060, 50, utc(2025, 6, 15, 23, 50, 0))
            .unwrap();
        assert_eq!(rec.streak, 1);

        // Ten minutes later but the next UTC day
        let rec = db
            .complete_challenge(user_id, c2, 40.7138, -74.0060, 100, utc(2025, 6, 16, 0, 0, 1))
            .unwrap();
        assert_eq!(rec.streak, 2);
        assert_eq!(rec.aura_points, 150);

        // Gap of three days resets
        let rec = db
            .complete_challenge(user_id, c3, 40.7148, -74.0060, 200, utc(2025, 6, 19, 12, 0, 0))
            .unwrap();
        assert_eq!(rec.streak, 1);
        assert_eq!(rec.aura_points, 350);
    }

    #[test]
    fn test_same_day_completion_keeps_streak() {
        let db = Database::open_in_memory().unwrap();
        let (user_id, c1) = seed(&db);
        let c2 = db
            .create_challenge("Rooftop view", "Climb up", 40.7138, -74.0060, "medium", 100)
            .unwrap();

        db.complete_challenge(user_id, c1, 40.7128, -74.0060, 50, utc(2025, 6, 15, 8, 0, 0))
            .unwrap();
        let rec = db
            .complete_challenge(user_id, c2, 40.7138, -74.0060, 100, utc(2025, 6, 15, 20, 0, 0))
            .unwrap();

        assert_eq!(rec.streak, 1);
        assert_eq!(rec.aura_points, 150);
    }

    #[test]
    fn test_concurrent_submissions_credit_points_exactly_once() {
        use std::sync::Arc;

        let db = Arc::new(Database::open_in_memory().unwrap());
        let (user_id, challenge_id) = seed(&db);
        let now = utc(2025, 6, 15, 12, 0, 0);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || {
                    db.complete_challenge(user_id, challenge_id, 40.7128, -74.0060, 50, now)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let dup = results
            .iter()
            .filter(|r| matches!(r, Err(CompletionTxError::AlreadyCompleted)))
            .count();

        assert_eq!(ok, 1);
        assert_eq!(dup, 7);

        let user = db.get_user_by_id(user_id).unwrap().unwrap();
        assert_eq!(user.aura_points, 50);
        assert_eq!(user.streak, 1);
    }

    #[test]
    fn test_missing_user_rolls_back_completion_insert() {
        let db = Database::open_in_memory().unwrap();
        let (_user_id, challenge_id) = seed(&db);

        // A user id that was never created
        let ghost = 9_999;
        let err = db
            .complete_challenge(ghost, challenge_id, 40.7128, -74.0060, 50, utc(2025, 6, 15, 12, 0, 0))
            .unwrap_err();

        // FK enforcement may reject the insert outright; either way the
        // transaction must leave no completion row behind.
        assert!(matches!(
            err,
            CompletionTxError::UserMissing | CompletionTxError::Db(_)
        ));
        assert!(db.get_completion(ghost, challenge_id).unwrap().is_none());
    }
}
