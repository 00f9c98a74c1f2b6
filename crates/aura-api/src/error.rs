use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use aura_db::completions::CompletionTxError;
use aura_db::queries::FlagError;

/// API failure taxonomy. Every variant renders the
/// `{ "success": false, "error": <message> }` envelope with its HTTP status;
/// only `Internal` is treated (and logged) as a server error.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Authentication required")]
    Unauthorized,
    #[error("You do not have permission to do that")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("You are {meters}m away from this challenge. Get within {radius}m to complete it.")]
    OutOfRange { meters: i64, radius: u32 },
    #[error("Challenge already completed")]
    AlreadyCompleted,
    #[error("{0}")]
    Conflict(String),
    #[error("Too many completion attempts. Try again later.")]
    RateLimited,
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) | ApiError::OutOfRange { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyCompleted | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref e) = self {
            error!("Internal error: {:#}", e);
        }
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

pub(crate) fn join_err(e: tokio::task::JoinError) -> ApiError {
    ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {}", e))
}

impl From<CompletionTxError> for ApiError {
    fn from(err: CompletionTxError) -> Self {
        match err {
            CompletionTxError::AlreadyCompleted => ApiError::AlreadyCompleted,
            CompletionTxError::UserMissing => ApiError::NotFound("User"),
            CompletionTxError::Db(e) => ApiError::Internal(e.into()),
            CompletionTxError::Internal(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<FlagError> for ApiError {
    fn from(err: FlagError) -> Self {
        match err {
            FlagError::Duplicate => {
                ApiError::Conflict("You have already flagged this completion".into())
            }
            FlagError::Db(e) => ApiError::Internal(e.into()),
            FlagError::Internal(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
        }
    }
}
