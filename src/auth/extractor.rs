use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use uuid::Uuid;

use crate::auth::jwt::TokenKind;
use crate::error::AppError;
use crate::state::SharedState;

/// Identity established from a valid access token.
///
/// As a plain extractor it is the mandatory guard: the request is rejected
/// with 401 when no valid bearer token is present. As `Option<AuthUser>` it
/// is the optional guard: a missing or bad token yields `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl AuthUser {
    fn from_parts(parts: &Parts, state: &SharedState) -> Result<Self, AppError> {
        let Authorization(bearer) = parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or_else(|| AppError::Unauthorized("Missing authentication token".to_string()))?;

        let user_id = state
            .tokens
            .verify(bearer.token(), TokenKind::Access)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(AuthUser { user_id })
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        Self::from_parts(parts, state)
    }
}

impl OptionalFromRequestParts<SharedState> for AuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(Self::from_parts(parts, state).ok())
    }
}
