use crate::models::{ChallengeRow, CompletionRow, FlagRow, LeaderboardRow, UserRow};
use crate::{Database, is_unique_violation};
use anyhow::Result;
use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlagError {
    #[error("completion already flagged by this user")]
    Duplicate,
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
    #[error("{0}")]
    Internal(String),
}

impl Database {
    // -- Users --

    pub fn create_user(&self, email: &str, name: &str, password_hash: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (email, name, password) VALUES (?1, ?2, ?3)",
                (email, name, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", &[&email]))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", &[&id]))
    }

    // -- Challenges --

    pub fn create_challenge(
        &self,
        title: &str,
        description: &str,
        latitude: f64,
        longitude: f64,
        difficulty: &str,
        points_reward: i64,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO challenges (title, description, latitude, longitude, difficulty, points_reward)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![title, description, latitude, longitude, difficulty, points_reward],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_challenge(&self, id: i64) -> Result<Option<ChallengeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, latitude, longitude, difficulty, points_reward, created_at
                 FROM challenges WHERE id = ?1",
            )?;
            stmt.query_row([id], challenge_from_row).optional()
        })
    }

    pub fn list_challenges(
        &self,
        difficulty: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ChallengeRow>> {
        self.with_conn(|conn| {
            let rows = match difficulty {
                Some(d) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, title, description, latitude, longitude, difficulty, points_reward, created_at
                         FROM challenges WHERE difficulty = ?1
                         ORDER BY created_at DESC, id DESC
                         LIMIT ?2 OFFSET ?3",
                    )?;
                    stmt.query_map(rusqlite::params![d, limit, offset], challenge_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, title, description, latitude, longitude, difficulty, points_reward, created_at
                         FROM challenges
                         ORDER BY created_at DESC, id DESC
                         LIMIT ?1 OFFSET ?2",
                    )?;
                    stmt.query_map(rusqlite::params![limit, offset], challenge_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })
    }

    // -- Completions --

    pub fn get_completion(&self, user_id: i64, challenge_id: i64) -> Result<Option<CompletionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, challenge_id, latitude, longitude, completed_at
                 FROM challenge_completions WHERE user_id = ?1 AND challenge_id = ?2",
            )?;
            stmt.query_row([user_id, challenge_id], completion_from_row).optional()
        })
    }

    pub fn get_completion_by_id(&self, id: i64) -> Result<Option<CompletionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, challenge_id, latitude, longitude, completed_at
                 FROM challenge_completions WHERE id = ?1",
            )?;
            stmt.query_row([id], completion_from_row).optional()
        })
    }

    pub fn list_completions_for_user(&self, user_id: i64, limit: u32) -> Result<Vec<CompletionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, challenge_id, latitude, longitude, completed_at
                 FROM challenge_completions WHERE user_id = ?1
                 ORDER BY completed_at DESC, id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], completion_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Flags --

    /// Insert a flag; the UNIQUE(completion_id, flagged_by_id) constraint is
    /// the authoritative duplicate guard.
    pub fn create_flag(
        &self,
        completion_id: i64,
        flagged_by_id: i64,
        reason: Option<&str>,
    ) -> std::result::Result<i64, FlagError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FlagError::Internal(format!("DB lock poisoned: {}", e)))?;

        conn.execute(
            "INSERT INTO flags (completion_id, flagged_by_id, reason) VALUES (?1, ?2, ?3)",
            rusqlite::params![completion_id, flagged_by_id, reason],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                FlagError::Duplicate
            } else {
                FlagError::Db(e)
            }
        })?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get_flag_by_id(&self, id: i64) -> Result<Option<FlagRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, completion_id, flagged_by_id, reason, created_at
                 FROM flags WHERE id = ?1",
            )?;
            stmt.query_row([id], flag_from_row).optional()
        })
    }

    pub fn list_flags(&self, limit: u32) -> Result<Vec<FlagRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, completion_id, flagged_by_id, reason, created_at
                 FROM flags
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], flag_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Leaderboard --

    pub fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, aura_points, streak
                 FROM users
                 ORDER BY aura_points DESC, id ASC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok(LeaderboardRow {
                        user_id: row.get(0)?,
                        name: row.get(1)?,
                        aura_points: row.get(2)?,
                        streak: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, filter: &str, params: &[&dyn rusqlite::types::ToSql]) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, email, name, password, role, aura_points, streak, last_completed_at, created_at
         FROM users WHERE {}",
        filter
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row(params, |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
                aura_points: row.get(5)?,
                streak: row.get(6)?,
                last_completed_at: row.get(7)?,
                created_at: row.get(8)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn challenge_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<ChallengeRow, rusqlite::Error> {
    Ok(ChallengeRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        difficulty: row.get(5)?,
        points_reward: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn completion_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<CompletionRow, rusqlite::Error> {
    Ok(CompletionRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        challenge_id: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        completed_at: row.get(5)?,
    })
}

fn flag_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<FlagRow, rusqlite::Error> {
    Ok(FlagRow {
        id: row.get(0)?,
        completion_id: row.get(1)?,
        flagged_by_id: row.get(2)?,
        reason: row.get(3)?,
        created_at: row.get(4)?,
    })
}


/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
