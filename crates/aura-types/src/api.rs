use serde::{Deserialize, Serialize};

use crate::models::{Difficulty, Role, UserProfile};

// -- JWT Claims --

/// JWT claims shared between the REST middleware and the auth handlers.
/// Canonical definition lives here in aura-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

// -- Response envelope --

/// Success envelope: `{ "success": true, "data": ..., "message": ... }`.
/// Failures use the error envelope in aura-api.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserProfile,
    pub token: String,
}

// -- Challenges --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateChallengeRequest {
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub difficulty: Difficulty,
    pub points_reward: i64,
}

// -- Completions --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompleteChallengeRequest {
    pub challenge_id: i64,
    pub latitude: f64,
    pub longitude: f64,
}

// -- Flags --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagCompletionRequest {
    #[serde(default)]
    pub reason: Option<String>,
}
