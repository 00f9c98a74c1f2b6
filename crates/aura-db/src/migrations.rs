use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            email             TEXT NOT NULL UNIQUE,
            name              TEXT NOT NULL,
            password          TEXT NOT NULL,
            role              TEXT NOT NULL DEFAULT 'user',
            aura_points       INTEGER NOT NULL DEFAULT 0,
            streak            INTEGER NOT NULL DEFAULT 0,
            last_completed_at TEXT,
            created_at        TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS challenges (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            title         TEXT NOT NULL,
            description   TEXT NOT NULL,
            latitude      REAL NOT NULL,
            longitude     REAL NOT NULL,
            difficulty    TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
            points_reward INTEGER NOT NULL CHECK (points_reward > 0),
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- UNIQUE(user_id, challenge_id) is the authoritative duplicate guard;
        -- the pre-transaction lookup in the API layer is a fast path only.
        CREATE TABLE IF NOT EXISTS challenge_completions (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id      INTEGER NOT NULL REFERENCES users(id),
            challenge_id INTEGER NOT NULL REFERENCES challenges(id),
            latitude     REAL NOT NULL,
            longitude    REAL NOT NULL,
            completed_at TEXT NOT NULL,
            UNIQUE(user_id, challenge_id)
        );

        CREATE INDEX IF NOT EXISTS idx_completions_user
            ON challenge_completions(user_id, completed_at);

        CREATE TABLE IF NOT EXISTS flags (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            completion_id INTEGER NOT NULL REFERENCES challenge_completions(id),
            flagged_by_id INTEGER NOT NULL REFERENCES users(id),
            reason        TEXT,
            created_at    TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(completion_id, flagged_by_id)
        );

        CREATE INDEX IF NOT EXISTS idx_flags_completion
            ON flags(completion_id);

        CREATE INDEX IF NOT EXISTS idx_users_points
            ON users(aura_points DESC);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
