//! Registration, login, token refresh, password reset and logout.
//!
//! A user moves `Registered -> LoggedIn -> LoggedOut`, or through
//! `PasswordResetRequested -> PasswordReset` and back to `LoggedIn` via a
//! fresh login. The only server-held session state is the single refresh
//! token slot on the user row; access tokens are stateless.

use std::sync::{Arc, LazyLock};

use chrono::{Duration, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::auth::jwt::{TokenCodec, TokenKind};
use crate::auth::notifier::ResetNotifier;
use crate::auth::{generate_token, hash_token, password};
use crate::error::AppError;
use crate::models::{NewUser, Profile, ProfileInput, User};
use crate::store::{CredentialStore, ProfileStore, StoreError};

pub const MIN_PASSWORD_LEN: usize = 6;

pub const EXPERIENCE_LEVELS: [&str; 4] = ["student", "junior", "mid", "senior"];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub profile: Option<ProfileInput>,
}

/// Result of register and login.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub profile: Option<Profile>,
}

pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    profiles: Arc<dyn ProfileStore>,
    tokens: TokenCodec,
    notifier: Arc<dyn ResetNotifier>,
    reset_token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        profiles: Arc<dyn ProfileStore>,
        tokens: TokenCodec,
        notifier: Arc<dyn ResetNotifier>,
        reset_token_ttl: Duration,
    ) -> Self {
        Self {
            users,
            profiles,
            tokens,
            notifier,
            reset_token_ttl,
        }
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    pub async fn register(&self, input: Registration) -> Result<AuthSession, AppError> {
        let (Some(email), Some(password)) = (
            non_blank(input.email.as_deref()),
            non_blank(input.password.as_deref()),
        ) else {
            return Err(AppError::Validation(
                "Please provide email and password".to_string(),
            ));
        };

        let email = validate_email(email)?;
        validate_password(password)?;
        if let Some(profile) = &input.profile {
            validate_profile(profile)?;
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateUser);
        }

        let password_hash = password::hash_password(password).map_err(AppError::Internal)?;
        let new_user = NewUser {
            email,
            password_hash,
            full_name: non_blank(input.full_name.as_deref()).map(str::to_string),
        };

        let (user, _profile) = self
            .users
            .create(new_user, input.profile)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AppError::DuplicateUser,
                other => other.into(),
            })?;

        let session = self.start_session(user).await?;
        tracing::info!(user_id = %session.user.id, "User registered");
        Ok(session)
    }

    pub async fn login(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<AuthSession, AppError> {
        let (Some(email), Some(password)) = (non_blank(email), non_blank(password)) else {
            return Err(AppError::Validation(
                "Please provide email and password".to_string(),
            ));
        };

        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let valid =
            password::verify_password(password, &user.password_hash).map_err(AppError::Internal)?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let session = self.start_session(user).await?;
        tracing::info!(user_id = %session.user.id, "User logged in");
        Ok(session)
    }

    /// Exchange a refresh token for a new pair. The presented token must be
    /// the one currently stored for its user; the swap to the new token is
    /// conditional on that, so each refresh token is accepted at most once.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<TokenPair, AppError> {
        let token = non_blank(refresh_token).ok_or(AppError::MissingToken)?;

        let user_id = self
            .tokens
            .verify(token, TokenKind::Refresh)
            .map_err(|_| AppError::InvalidOrExpiredToken)?;

        let pair = self.issue_pair(user_id)?;

        let rotated = self
            .users
            .rotate_refresh_token(user_id, &hash_token(token), &hash_token(&pair.refresh_token))
            .await?;

        if !rotated {
            tracing::warn!(%user_id, "Refresh token is not the current one for this user");
            return Err(AppError::InvalidOrExpiredToken);
        }

        Ok(pair)
    }

    /// Issue a reset token for `email` if it belongs to a user. The outcome is
    /// not observable by the caller.
    pub async fn forgot_password(&self, email: Option<&str>) -> Result<(), AppError> {
        let email = non_blank(email)
            .ok_or_else(|| AppError::Validation("Please provide email".to_string()))?;
        let email = validate_email(email)?;

        let token = generate_token();
        let expires_at = Utc::now() + self.reset_token_ttl;

        match self
            .users
            .set_password_reset_token(&email, &hash_token(&token), expires_at)
            .await?
        {
            Some(user) => {
                tracing::info!(user_id = %user.id, "Password reset requested");
                self.notifier.send_reset_token(&user.email, &token).await;
            }
            None => {
                tracing::debug!("Password reset requested for unknown email");
            }
        }

        Ok(())
    }

    pub async fn reset_password(
        &self,
        token: Option<&str>,
        new_password: Option<&str>,
    ) -> Result<(), AppError> {
        let (Some(token), Some(new_password)) = (non_blank(token), non_blank(new_password)) else {
            return Err(AppError::Validation(
                "Please provide token and new password".to_string(),
            ));
        };
        validate_password(new_password)?;

        let token_hash = hash_token(token);
        if self.users.verify_reset_token(&token_hash).await?.is_none() {
            return Err(AppError::InvalidOrExpiredToken);
        }

        let password_hash = password::hash_password(new_password).map_err(AppError::Internal)?;

        // The write consumes the token; a concurrent reset gets no row back.
        let user = self
            .users
            .reset_password(&token_hash, &password_hash)
            .await?
            .ok_or(AppError::InvalidOrExpiredToken)?;

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<CurrentUser, AppError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let profile = self.profiles.find_by_user(user_id).await?;

        Ok(CurrentUser { user, profile })
    }

    /// Clear the stored refresh token. Succeeds whether or not one was set.
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AppError> {
        self.users.update_refresh_token(user_id, None).await?;
        tracing::info!(%user_id, "User logged out");
        Ok(())
    }

    async fn start_session(&self, user: User) -> Result<AuthSession, AppError> {
        let pair = self.issue_pair(user.id)?;
        self.users
            .update_refresh_token(user.id, Some(&hash_token(&pair.refresh_token)))
            .await?;

        Ok(AuthSession {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self
                .tokens
                .issue_access_token(user_id)
                .map_err(AppError::Internal)?,
            refresh_token: self
                .tokens
                .issue_refresh_token(user_id)
                .map_err(AppError::Internal)?,
        })
    }
}

/// Emails are compared case-insensitively; this is the stored form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize and check the shape of an email address.
pub fn validate_email(email: &str) -> Result<String, AppError> {
    let email = normalize_email(email);
    if EMAIL_RE.is_match(&email) {
        Ok(email)
    } else {
        Err(AppError::Validation(
            "Please provide a valid email".to_string(),
        ))
    }
}

/// Reject profile payloads the store would refuse.
pub fn validate_profile(profile: &ProfileInput) -> Result<(), AppError> {
    match profile.experience_level.as_deref() {
        Some(level) if !EXPERIENCE_LEVELS.contains(&level) => Err(AppError::Validation(format!(
            "Experience level must be one of: {}",
            EXPERIENCE_LEVELS.join(", ")
        ))),
        _ => Ok(()),
    }
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
