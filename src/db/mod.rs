pub mod profiles;
pub mod trends;
pub mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    NewTrend, NewUser, Profile, ProfileInput, Trend, TrendFilter, TrendUpdate, User, UserUpdate,
};
use crate::store::{CredentialStore, ProfileStore, StoreError, TrendStore};

/// Postgres-backed implementation of the store traits.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(users::find_by_email(&self.pool, email).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(users::find_by_id(&self.pool, id).await?)
    }

    async fn create(
        &self,
        new_user: NewUser,
        profile: Option<ProfileInput>,
    ) -> Result<(User, Option<Profile>), StoreError> {
        let mut tx = self.pool.begin().await?;

        let user = users::create(
            &mut *tx,
            &new_user.email,
            &new_user.password_hash,
            new_user.full_name.as_deref(),
        )
        .await?;

        let profile = match profile {
            Some(input) => Some(profiles::create(&mut *tx, user.id, &input).await?),
            None => None,
        };

        tx.commit().await?;
        Ok((user, profile))
    }

    async fn update(&self, id: Uuid, changes: &UserUpdate) -> Result<Option<User>, StoreError> {
        Ok(users::update(
            &self.pool,
            id,
            changes.full_name.as_deref(),
            changes.email.as_deref(),
        )
        .await?)
    }

    async fn update_refresh_token(
        &self,
        id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<(), StoreError> {
        Ok(users::update_refresh_token(&self.pool, id, token_hash).await?)
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        current_hash: &str,
        next_hash: &str,
    ) -> Result<bool, StoreError> {
        Ok(users::rotate_refresh_token(&self.pool, id, current_hash, next_hash).await?)
    }

    async fn set_password_reset_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        Ok(users::set_password_reset_token(&self.pool, email, token_hash, expires_at).await?)
    }

    async fn verify_reset_token(&self, token_hash: &str) -> Result<Option<User>, StoreError> {
        Ok(users::find_by_valid_reset_token(&self.pool, token_hash).await?)
    }

    async fn reset_password(
        &self,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(users::reset_password(&self.pool, token_hash, password_hash).await?)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(users::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(profiles::find_by_user(&self.pool, user_id).await?)
    }

    async fn upsert(&self, user_id: Uuid, input: &ProfileInput) -> Result<Profile, StoreError> {
        Ok(profiles::upsert(&self.pool, user_id, input).await?)
    }
}

#[async_trait]
impl TrendStore for PgStore {
    async fn list(&self, filter: &TrendFilter) -> Result<Vec<Trend>, StoreError> {
        Ok(trends::list(&self.pool, filter).await?)
    }

    async fn domains(&self) -> Result<Vec<String>, StoreError> {
        Ok(trends::domains(&self.pool).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Trend>, StoreError> {
        Ok(trends::find_by_id(&self.pool, id).await?)
    }

    async fn create(&self, trend: NewTrend) -> Result<Trend, StoreError> {
        Ok(trends::create(&self.pool, &trend).await?)
    }

    async fn create_many(&self, new_trends: Vec<NewTrend>) -> Result<Vec<Trend>, StoreError> {
        Ok(trends::create_many(&self.pool, &new_trends).await?)
    }

    async fn update(&self, id: Uuid, changes: &TrendUpdate) -> Result<Option<Trend>, StoreError> {
        Ok(trends::update(&self.pool, id, changes).await?)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(trends::delete(&self.pool, id).await?)
    }
}
