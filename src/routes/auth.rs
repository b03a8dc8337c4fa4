use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::auth::service::{AuthSession, Registration};
use crate::error::AppError;
use crate::models::{Profile, ProfileInput, User};
use crate::routes::{Envelope, json_body};
use crate::state::SharedState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub profile: Option<ProfileInput>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    pub user: UserSummary,
    pub token: String,
    pub refresh_token: String,
}

impl From<AuthSession> for AuthData {
    fn from(session: AuthSession) -> Self {
        AuthData {
            user: UserSummary {
                id: session.user.id,
                email: session.user.email,
                full_name: session.user.full_name,
            },
            token: session.access_token,
            refresh_token: session.refresh_token,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct MeData {
    pub user: User,
    pub profile: Option<Profile>,
}

pub async fn register(
    State(state): State<SharedState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<AuthData>>), AppError> {
    let req = json_body(payload)?;

    let session = state
        .auth
        .register(Registration {
            email: req.email,
            password: req.password,
            full_name: req.full_name,
            profile: req.profile,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "User registered successfully",
            session.into(),
        )),
    ))
}

pub async fn login(
    State(state): State<SharedState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Envelope<AuthData>>, AppError> {
    let req = json_body(payload)?;
    let email = req.email.as_deref().unwrap_or_default();

    if let Err(retry_after) = state.login_limiter.check(email) {
        return Err(AppError::RateLimited(format!(
            "Too many login attempts. Please try again in {retry_after} seconds."
        )));
    }

    match state.auth.login(req.email.as_deref(), req.password.as_deref()).await {
        Ok(session) => {
            state.login_limiter.reset(email);
            Ok(Json(Envelope::with_message("Login successful", session.into())))
        }
        Err(AppError::InvalidCredentials) => {
            state.login_limiter.record_failure(email);
            Err(AppError::InvalidCredentials)
        }
        Err(e) => Err(e),
    }
}

pub async fn refresh_token(
    State(state): State<SharedState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<Envelope<TokenData>>, AppError> {
    let req = json_body(payload)?;
    let pair = state.auth.refresh(req.refresh_token.as_deref()).await?;

    Ok(Json(Envelope::data(TokenData {
        token: pair.access_token,
        refresh_token: pair.refresh_token,
    })))
}

pub async fn forgot_password(
    State(state): State<SharedState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<Envelope<()>>, AppError> {
    let req = json_body(payload)?;
    state.auth.forgot_password(req.email.as_deref()).await?;

    // Same answer whether or not the email is registered.
    Ok(Json(Envelope::message(
        "If the email exists, a reset link will be sent",
    )))
}

pub async fn reset_password(
    State(state): State<SharedState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<Envelope<()>>, AppError> {
    let req = json_body(payload)?;
    state
        .auth
        .reset_password(req.token.as_deref(), req.new_password.as_deref())
        .await?;

    Ok(Json(Envelope::message("Password reset successful")))
}

pub async fn me(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Envelope<MeData>>, AppError> {
    let current = state.auth.current_user(auth.user_id).await?;

    Ok(Json(Envelope::data(MeData {
        user: current.user,
        profile: current.profile,
    })))
}

pub async fn logout(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Envelope<()>>, AppError> {
    state.auth.logout(auth.user_id).await?;
    Ok(Json(Envelope::message("Logout successful")))
}
