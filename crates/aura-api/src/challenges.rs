use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use aura_types::api::{ApiResponse, Claims, CreateChallengeRequest};
use aura_types::models::{Difficulty, Role};

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, join_err};

#[derive(Debug, Deserialize)]
pub struct ChallengeQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    pub difficulty: Option<Difficulty>,
}

fn default_limit() -> u32 {
    20
}

pub async fn list_challenges(
    State(state): State<AppState>,
    Query(query): Query<ChallengeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let limit = query.limit.min(100);
    let offset = query.offset;
    let difficulty = query.difficulty;

    let rows = tokio::task::spawn_blocking(move || {
        db.db
            .list_challenges(difficulty.map(|d| d.as_str()), limit, offset)
    })
    .await
    .map_err(join_err)??;

    let challenges = rows
        .into_iter()
        .map(convert::challenge)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ApiResponse::ok(challenges)))
}

pub async fn get_challenge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if id <= 0 {
        return Err(ApiError::InvalidRequest(
            "challenge id must be a positive integer".into(),
        ));
    }

    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_challenge(id))
        .await
        .map_err(join_err)??
        .ok_or(ApiError::NotFound("Challenge"))?;

    Ok(Json(ApiResponse::ok(convert::challenge(row)?)))
}

/// Admin-only: create a new challenge.
pub async fn create_challenge(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateChallengeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }

    if req.title.trim().is_empty() || req.title.len() > 128 {
        return Err(ApiError::InvalidRequest(
            "Title must be between 1 and 128 characters".into(),
        ));
    }
    if !req.latitude.is_finite() || !(-90.0..=90.0).contains(&req.latitude) {
        return Err(ApiError::InvalidRequest(
            "latitude must be between -90 and 90".into(),
        ));
    }
    if !req.longitude.is_finite() || !(-180.0..=180.0).contains(&req.longitude) {
        return Err(ApiError::InvalidRequest(
            "longitude must be between -180 and 180".into(),
        ));
    }
    if req.points_reward <= 0 {
        return Err(ApiError::InvalidRequest(
            "pointsReward must be a positive integer".into(),
        ));
    }

    let db = state.clone();
    let id = tokio::task::spawn_blocking(move || {
        db.db.create_challenge(
            req.title.trim(),
            &req.description,
            req.latitude,
            req.longitude,
            req.difficulty.as_str(),
            req.points_reward,
        )
    })
    .await
    .map_err(join_err)??;

    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_challenge(id))
        .await
        .map_err(join_err)??
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("challenge {} vanished after insert", id)))?;

    info!("Challenge {} created by user {}", id, claims.sub);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(convert::challenge(row)?)),
    ))
}
