use axum::{Extension, Json, extract::State, response::IntoResponse};

use aura_types::api::{ApiResponse, Claims};

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, join_err};

/// The authenticated user's profile, including current points and streak.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub;

    let row = tokio::task::spawn_blocking(move || db.db.get_user_by_id(user_id))
        .await
        .map_err(join_err)??
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(ApiResponse::ok(convert::user_profile(row)?)))
}
