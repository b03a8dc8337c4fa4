use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use crate::auth::AuthUser;
use crate::auth::service::{validate_email, validate_profile};
use crate::error::AppError;
use crate::models::{Profile, ProfileInput, User, UserUpdate};
use crate::routes::{Envelope, json_body};
use crate::state::SharedState;
use crate::store::StoreError;

pub async fn get_profile(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Envelope<Profile>>, AppError> {
    let profile = state
        .stores
        .profiles
        .find_by_user(auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(Envelope::data(profile)))
}

pub async fn upsert_profile(
    auth: AuthUser,
    State(state): State<SharedState>,
    payload: Result<Json<ProfileInput>, JsonRejection>,
) -> Result<Json<Envelope<Profile>>, AppError> {
    let input = json_body(payload)?;
    validate_profile(&input)?;

    if state.stores.users.find_by_id(auth.user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let existed = state
        .stores
        .profiles
        .find_by_user(auth.user_id)
        .await?
        .is_some();
    let profile = state.stores.profiles.upsert(auth.user_id, &input).await?;

    let message = if existed {
        "Profile updated"
    } else {
        "Profile created"
    };
    Ok(Json(Envelope::with_message(message, profile)))
}

/// Only the display name and email can change here; credentials and tokens
/// have their own flows.
pub async fn update_user(
    auth: AuthUser,
    State(state): State<SharedState>,
    payload: Result<Json<UserUpdate>, JsonRejection>,
) -> Result<Json<Envelope<User>>, AppError> {
    let req = json_body(payload)?;

    let changes = UserUpdate {
        full_name: req
            .full_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()),
        email: req.email.as_deref().map(validate_email).transpose()?,
    };

    if changes.full_name.is_none() && changes.email.is_none() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }

    let user = state
        .stores
        .users
        .update(auth.user_id, &changes)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::DuplicateUser,
            other => other.into(),
        })?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(Envelope::with_message("User updated successfully", user)))
}

pub async fn delete_account(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Envelope<()>>, AppError> {
    if !state.stores.users.delete(auth.user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %auth.user_id, "Account deleted");
    Ok(Json(Envelope::message("Account deleted successfully")))
}
