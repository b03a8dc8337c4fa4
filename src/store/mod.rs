//! Persistence seams used by the auth service and the API handlers.
//!
//! Every operation is a single-row (or single-query) lookup or update.
//! Two backends implement the traits: [`crate::db::PgStore`] and
//! [`memory::MemoryStore`].

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    NewTrend, NewUser, Profile, ProfileInput, Trend, TrendFilter, TrendUpdate, User, UserUpdate,
};

#[derive(Debug)]
pub enum StoreError {
    /// The backing store could not be reached or timed out.
    Unavailable(String),
    /// A uniqueness constraint rejected the write.
    Conflict(String),
    Other(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {msg}"),
            StoreError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            StoreError::Other(msg) => write!(f, "Store error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            _ => StoreError::Other(err.to_string()),
        }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Create a user and, when given, its profile. Both rows are written or
    /// neither is.
    async fn create(
        &self,
        user: NewUser,
        profile: Option<ProfileInput>,
    ) -> Result<(User, Option<Profile>), StoreError>;

    async fn update(&self, id: Uuid, changes: &UserUpdate) -> Result<Option<User>, StoreError>;

    async fn update_refresh_token(
        &self,
        id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Replace the stored refresh token only if it still equals `current_hash`.
    /// Returns `false` when the slot held something else.
    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        current_hash: &str,
        next_hash: &str,
    ) -> Result<bool, StoreError>;

    async fn set_password_reset_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    /// Find the user holding `token_hash` whose reset window is still open.
    async fn verify_reset_token(&self, token_hash: &str) -> Result<Option<User>, StoreError>;

    /// Consume a reset token. When `token_hash` is held by a user and its
    /// window is still open, store `password_hash` and clear the reset pair
    /// and the refresh token in the same write. Returns `None` when the token
    /// is unknown, expired or was consumed by a concurrent call.
    async fn reset_password(
        &self,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError>;

    async fn upsert(&self, user_id: Uuid, input: &ProfileInput) -> Result<Profile, StoreError>;
}

#[async_trait]
pub trait TrendStore: Send + Sync {
    async fn list(&self, filter: &TrendFilter) -> Result<Vec<Trend>, StoreError>;

    async fn domains(&self) -> Result<Vec<String>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Trend>, StoreError>;

    async fn create(&self, trend: NewTrend) -> Result<Trend, StoreError>;

    /// Insert every trend or none of them.
    async fn create_many(&self, trends: Vec<NewTrend>) -> Result<Vec<Trend>, StoreError>;

    async fn update(&self, id: Uuid, changes: &TrendUpdate) -> Result<Option<Trend>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// The three store handles, usually backed by one pool or one in-memory map set.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn CredentialStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub trends: Arc<dyn TrendStore>,
}

impl Stores {
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = crate::db::PgStore::new(pool);
        Self {
            users: Arc::new(store.clone()),
            profiles: Arc::new(store.clone()),
            trends: Arc::new(store),
        }
    }

    pub fn memory() -> Self {
        Self::from_memory(memory::MemoryStore::new())
    }

    /// Wrap an existing in-memory store so callers can keep a handle to it.
    pub fn from_memory(store: memory::MemoryStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            profiles: Arc::new(store.clone()),
            trends: Arc::new(store),
        }
    }
}
