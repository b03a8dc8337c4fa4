pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod store;

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{LogNotifier, MailNotifier, ResetNotifier};
use crate::config::Config;
use crate::email::SystemMailer;
use crate::error::AppError;
use crate::state::SharedState;

/// Pick the reset-token delivery channel from config: SMTP when it is
/// configured and usable, otherwise the server log.
pub fn build_notifier(config: &Config) -> Arc<dyn ResetNotifier> {
    let Some(smtp) = config.smtp.as_ref() else {
        tracing::warn!("System SMTP not configured; reset tokens will only be logged");
        return Arc::new(LogNotifier);
    };

    match SystemMailer::new(smtp) {
        Ok(mailer) => {
            tracing::info!("System SMTP configured");
            Arc::new(MailNotifier::new(Arc::new(mailer), &config.base_url))
        }
        Err(e) => {
            tracing::warn!("System SMTP not available: {e}");
            Arc::new(LogNotifier)
        }
    }
}

pub fn build_app(state: SharedState) -> Router {
    let cors = match state.config.cors_origin.as_str() {
        "*" => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        origin => match HeaderValue::from_str(origin) {
            Ok(origin) => CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS_ORIGIN '{origin}': {e}");
                CorsLayer::new()
            }
        },
    };

    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .fallback(not_found)
        .layer(layers)
        .with_state(state)
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    match state.stores.users.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Server is healthy",
                "database": "connected",
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "message": "Server is unhealthy",
                    "database": "disconnected",
                })),
            )
        }
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
