use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use aura_types::api::{ApiResponse, Claims, FlagCompletionRequest};
use aura_types::models::Role;

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, join_err};

/// Report a suspicious completion. Users cannot flag their own completions,
/// and the UNIQUE(completion_id, flagged_by_id) constraint keeps repeat
/// reports out.
pub async fn flag_completion(
    State(state): State<AppState>,
    Path(completion_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FlagCompletionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if completion_id <= 0 {
        return Err(ApiError::InvalidRequest(
            "completion id must be a positive integer".into(),
        ));
    }
    if let Some(reason) = &req.reason {
        if reason.len() > 500 {
            return Err(ApiError::InvalidRequest(
                "Reason must be at most 500 characters".into(),
            ));
        }
    }

    let db = state.clone();
    let completion = tokio::task::spawn_blocking(move || db.db.get_completion_by_id(completion_id))
        .await
        .map_err(join_err)??
        .ok_or(ApiError::NotFound("Completion"))?;

    if completion.user_id == claims.sub {
        return Err(ApiError::InvalidRequest(
            "You cannot flag your own completion".into(),
        ));
    }

    let db = state.clone();
    let flagged_by = claims.sub;
    let reason = req.reason.clone();
    let flag_id = tokio::task::spawn_blocking(move || {
        db.db.create_flag(completion_id, flagged_by, reason.as_deref())
    })
    .await
    .map_err(join_err)??;

    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_flag_by_id(flag_id))
        .await
        .map_err(join_err)??
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("flag {} vanished after insert", flag_id)))?;

    info!(
        "Completion {} flagged by user {} (flag {})",
        completion_id, flagged_by, flag_id
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            convert::flag(row)?,
            "Completion flagged for review",
        )),
    ))
}

#[derive(Debug, Deserialize)]
pub struct FlagQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

/// Admin-only: flagged completions awaiting review, newest first.
pub async fn list_flags(
    State(state): State<AppState>,
    Query(query): Query<FlagQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }

    let db = state.clone();
    let limit = query.limit.min(200);
    let rows = tokio::task::spawn_blocking(move || db.db.list_flags(limit))
        .await
        .map_err(join_err)??;

    let flags = rows
        .into_iter()
        .map(convert::flag)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ApiResponse::ok(flags)))
}
