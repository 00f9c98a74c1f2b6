use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use aura_types::api::ApiResponse;
use aura_types::models::LeaderboardEntry;

use crate::auth::AppState;
use crate::error::{ApiError, join_err};

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

/// Top users by aura points. Ties break by account age (lower id first).
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let limit = query.limit.min(100);

    let rows = tokio::task::spawn_blocking(move || db.db.leaderboard(limit))
        .await
        .map_err(join_err)??;

    let entries: Vec<LeaderboardEntry> = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| LeaderboardEntry {
            rank: i as u32 + 1,
            user_id: row.user_id,
            name: row.name,
            aura_points: row.aura_points,
            streak: row.streak.max(0) as u32,
        })
        .collect();

    Ok(Json(ApiResponse::ok(entries)))
}
