use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};

use aura_db::Database;
use aura_types::api::{
    ApiResponse, Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
};
use aura_types::models::Role;

use crate::convert;
use crate::error::ApiError;
use crate::rate_limit::RateLimiter;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Maximum distance in meters from a challenge at which a completion
    /// submission still counts.
    pub geofence_radius_m: f64,
    pub completion_limiter: RateLimiter,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if !req.email.contains('@') || req.email.len() > 254 {
        return Err(ApiError::InvalidRequest("A valid email is required".into()));
    }
    if req.name.trim().is_empty() || req.name.len() > 64 {
        return Err(ApiError::InvalidRequest(
            "Name must be between 1 and 64 characters".into(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::InvalidRequest(
            "Password must be at least 8 characters".into(),
        ));
    }

    // Check if the email is taken
    if state.db.get_user_by_email(&req.email)?.is_some() {
        return Err(ApiError::Conflict("Email is already registered".into()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = state.db.create_user(&req.email, &req.name, &password_hash)?;

    let token = create_token(&state.jwt_secret, user_id, &req.email, Role::User)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(RegisterResponse { user_id, token })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored password hash unreadable: {}", e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let profile = convert::user_profile(user)?;
    let token = create_token(&state.jwt_secret, profile.id, &profile.email, profile.role)?;

    Ok(Json(ApiResponse::ok(LoginResponse { user: profile, token })))
}

fn create_token(secret: &str, user_id: i64, email: &str, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
