use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Startup configuration problems. These are the only fatal errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SAVE_COOLDOWN is not set (seconds between saves)")]
    MissingCooldown,

    #[error("SAVE_COOLDOWN must be a positive number of seconds, got {0:?}")]
    InvalidCooldown(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Engine is not running")]
    EngineUnavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::EngineUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
