pub mod auth;
pub mod trends;
pub mod user;

use axum::extract::rejection::JsonRejection;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Serialize;

use crate::error::AppError;
use crate::state::SharedState;

/// Response body shared by every endpoint: `{ success, message?, data? }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            data: None,
        }
    }
}

/// Unwrap a JSON body, turning a malformed payload into a validation error.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh-token", post(auth::refresh_token))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        // User
        .route(
            "/api/user/profile",
            get(user::get_profile)
                .put(user::upsert_profile)
                .post(user::upsert_profile),
        )
        .route("/api/user/update", put(user::update_user))
        .route("/api/user/account", delete(user::delete_account))
        // Trends
        .route("/api/trends", get(trends::list).post(trends::create))
        .route("/api/trends/domains", get(trends::domains))
        .route("/api/trends/recent", get(trends::recent))
        .route("/api/trends/search", get(trends::search))
        .route("/api/trends/bulk", post(trends::bulk_create))
        .route(
            "/api/trends/{id}",
            get(trends::get).put(trends::update).delete(trends::delete),
        )
}
