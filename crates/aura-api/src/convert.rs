//! Row-to-wire conversions. Enum and timestamp columns are validated here;
//! a value that fails to parse means a corrupt row and surfaces as a 500.

use anyhow::anyhow;

use aura_db::models::{ChallengeRow, CompletionRow, FlagRow, UserRow, parse_utc};
use aura_types::models::{Challenge, Completion, Difficulty, Flag, Role, UserProfile};

use crate::error::ApiError;

pub fn challenge(row: ChallengeRow) -> Result<Challenge, ApiError> {
    let difficulty = Difficulty::parse(&row.difficulty)
        .ok_or_else(|| anyhow!("bad difficulty '{}' on challenge {}", row.difficulty, row.id))?;
    Ok(Challenge {
        id: row.id,
        title: row.title,
        description: row.description,
        latitude: row.latitude,
        longitude: row.longitude,
        difficulty,
        points_reward: row.points_reward,
        created_at: parse_utc(&row.created_at)?,
    })
}

pub fn user_profile(row: UserRow) -> Result<UserProfile, ApiError> {
    let role = Role::parse(&row.role)
        .ok_or_else(|| anyhow!("bad role '{}' on user {}", row.role, row.id))?;
    Ok(UserProfile {
        id: row.id,
        email: row.email,
        name: row.name,
        role,
        aura_points: row.aura_points,
        streak: row.streak.max(0) as u32,
        last_completed_at: row.last_completed_at.as_deref().map(parse_utc).transpose()?,
        created_at: parse_utc(&row.created_at)?,
    })
}

pub fn completion(row: CompletionRow) -> Result<Completion, ApiError> {
    Ok(Completion {
        id: row.id,
        user_id: row.user_id,
        challenge_id: row.challenge_id,
        latitude: row.latitude,
        longitude: row.longitude,
        completed_at: parse_utc(&row.completed_at)?,
    })
}

pub fn flag(row: FlagRow) -> Result<Flag, ApiError> {
    Ok(Flag {
        id: row.id,
        completion_id: row.completion_id,
        flagged_by_id: row.flagged_by_id,
        reason: row.reason,
        created_at: parse_utc(&row.created_at)?,
    })
}
