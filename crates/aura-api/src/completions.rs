//! The completion flow: geofence check, duplicate guard, and the atomic
//! points/streak transaction in aura-db.

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use aura_core::geo::distance_meters;
use aura_types::api::{ApiResponse, Claims, CompleteChallengeRequest};

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, join_err};

pub async fn complete_challenge(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CompleteChallengeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.challenge_id <= 0 {
        return Err(ApiError::InvalidRequest(
            "challengeId must be a positive integer".into(),
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

    if !state.completion_limiter.check(claims.sub) {
        return Err(ApiError::RateLimited);
    }

    let db = state.clone();
    let challenge_id = req.challenge_id;
    let challenge = tokio::task::spawn_blocking(move || db.db.get_challenge(challenge_id))
        .await
        .map_err(join_err)??
        .ok_or(ApiError::NotFound("Challenge"))?;

    let distance = check_geofence(
        req.latitude,
        req.longitude,
        challenge.latitude,
        challenge.longitude,
        state.geofence_radius_m,
    )?;

    // Fast-path duplicate check. Two concurrent first-time submissions can
    // both pass it; the UNIQUE(user_id, challenge_id) constraint inside the
    // transaction is what actually guarantees at-most-once.
    let db = state.clone();
    let user_id = claims.sub;
    if tokio::task::spawn_blocking(move || db.db.get_completion(user_id, challenge_id))
        .await
        .map_err(join_err)??
        .is_some()
    {
        return Err(ApiError::AlreadyCompleted);
    }

    let now = chrono::Utc::now();
    let db = state.clone();
    let points_reward = challenge.points_reward;
    let (latitude, longitude) = (req.latitude, req.longitude);
    let record = tokio::task::spawn_blocking(move || {
        db.db
            .complete_challenge(user_id, challenge_id, latitude, longitude, points_reward, now)
    })
    .await
    .map_err(join_err)??;

    info!(
        "User {} completed challenge {} ({:.0}m away, streak {})",
        user_id, challenge_id, distance, record.streak
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            convert::completion(record.completion)?,
            "Challenge completed successfully!",
        )),
    ))
}

/// Distance gate for a submission: the distance in meters when the user is
/// inside the radius, `OutOfRange` (with the rounded distance) when not.
fn check_geofence(
    user_lat: f64,
    user_lon: f64,
    challenge_lat: f64,
    challenge_lon: f64,
    radius_m: f64,
) -> Result<f64, ApiError> {
    let distance = distance_meters(user_lat, user_lon, challenge_lat, challenge_lon);
    if distance > radius_m {
        return Err(ApiError::OutOfRange {
            meters: distance.round() as i64,
            radius: radius_m.round() as u32,
        });
    }
    Ok(distance)
}

#[derive(Debug, Deserialize)]
pub struct CompletionQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

/// The caller's own completions, newest first.
pub async fn list_my_completions(
    State(state): State<AppState>,
    Query(query): Query<CompletionQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub;
    let limit = query.limit.min(200);

    let rows = tokio::task::spawn_blocking(move || db.db.list_completions_for_user(user_id, limit))
        .await
        .map_err(join_err)??;

    let completions = rows
        .into_iter()
        .map(convert::completion)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ApiResponse::ok(completions)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_out_of_range_rejection_reports_rounded_distance() {
        // Challenge in lower Manhattan, submission ~455m to the east
        let err = check_geofence(40.7128, -74.0006, 40.7128, -74.0060, 100.0).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let msg = err.to_string();
        assert!(msg.contains("455m"), "message was: {}", msg);
        assert!(msg.contains("100m"), "message was: {}", msg);
    }

    #[test]
    fn test_exact_coordinates_pass_geofence() {
        let d = check_geofence(40.7128, -74.0060, 40.7128, -74.0060, 100.0).unwrap();
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_radius_is_configurable_not_fixed() {
        // The same 455m submission passes once the radius is widened
        assert!(check_geofence(40.7128, -74.0006, 40.7128, -74.0060, 500.0).is_ok());
        assert!(check_geofence(40.7128, -74.0006, 40.7128, -74.0060, 454.0).is_err());
    }
}
