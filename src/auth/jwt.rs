//! Signing and verification of access and refresh tokens.
//!
//! Both kinds are HS256 JWTs carrying the user id as `sub`. They are signed
//! with different secrets so that one kind can never be accepted as the
//! other, and a leaked access secret cannot mint refresh tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    /// Only set on refresh tokens, so two minted in the same second differ.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<Uuid>,
}

/// Uniform verification failure: bad signature, wrong kind, malformed or expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidToken;

impl std::fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid or expired token")
    }
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl SigningKeys {
    fn new(secret: &str, lifetime: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_lifetime: Duration,
        refresh_lifetime: Duration,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            access: SigningKeys::new(access_secret, access_lifetime),
            refresh: SigningKeys::new(refresh_secret, refresh_lifetime),
            validation,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_secret,
            &config.jwt_refresh_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        )
    }

    pub fn issue_access_token(&self, user_id: Uuid) -> Result<String, String> {
        self.issue(user_id, TokenKind::Access)
    }

    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, String> {
        self.issue(user_id, TokenKind::Refresh)
    }

    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Uuid, InvalidToken> {
        decode::<Claims>(token, &self.keys(kind).decoding, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|e| {
                tracing::debug!("Rejected {kind:?} token: {e}");
                InvalidToken
            })
    }

    fn issue(&self, user_id: Uuid, kind: TokenKind) -> Result<String, String> {
        let keys = self.keys(kind);
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + keys.lifetime).timestamp(),
            jti: (kind == TokenKind::Refresh).then(Uuid::now_v7),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| format!("JWT encode failed: {e}"))
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}
