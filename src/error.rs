use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::store::StoreError;

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    MissingToken,
    DuplicateUser,
    InvalidCredentials,
    Unauthorized(String),
    InvalidOrExpiredToken,
    NotFound(String),
    RateLimited(String),
    ServiceUnavailable,
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation: {msg}"),
            AppError::MissingToken => write!(f, "Refresh token required"),
            AppError::DuplicateUser => write!(f, "User already exists with this email"),
            AppError::InvalidCredentials => write!(f, "Invalid credentials"),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            AppError::InvalidOrExpiredToken => write!(f, "Invalid or expired token"),
            AppError::NotFound(msg) => write!(f, "Not Found: {msg}"),
            AppError::RateLimited(msg) => write!(f, "Rate Limited: {msg}"),
            AppError::ServiceUnavailable => write!(f, "Service unavailable"),
            AppError::Internal(msg) => write!(f, "Internal Error: {msg}"),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::MissingToken => StatusCode::BAD_REQUEST,
            AppError::DuplicateUser => StatusCode::CONFLICT,
            AppError::InvalidCredentials
            | AppError::Unauthorized(_)
            | AppError::InvalidOrExpiredToken => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::RateLimited(msg) => msg.clone(),
            AppError::MissingToken => "Refresh token required".to_string(),
            AppError::DuplicateUser => "User already exists with this email".to_string(),
            AppError::InvalidCredentials => "Invalid credentials".to_string(),
            AppError::InvalidOrExpiredToken => "Invalid or expired token".to_string(),
            AppError::ServiceUnavailable => {
                "Service temporarily unavailable, please retry".to_string()
            }
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal(msg) => tracing::error!("Internal error: {msg}"),
            AppError::ServiceUnavailable => tracing::warn!("Store unavailable"),
            _ => {}
        }

        let body = json!({ "success": false, "message": self.public_message() });
        (self.status(), axum::Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => {
                tracing::error!("Store unavailable: {msg}");
                AppError::ServiceUnavailable
            }
            StoreError::Conflict(msg) => AppError::Internal(format!("Unexpected conflict: {msg}")),
            StoreError::Other(msg) => AppError::Internal(msg),
        }
    }
}
