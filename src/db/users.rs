use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    email: &str,
    password_hash: &str,
    full_name: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (email, password_hash, full_name)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .fetch_one(executor)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    full_name: Option<&str>,
    email: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users
         SET full_name = COALESCE($2, full_name),
             email = COALESCE($3, email),
             updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(full_name)
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn update_refresh_token(
    pool: &PgPool,
    id: Uuid,
    token_hash: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET refresh_token_hash = $2 WHERE id = $1")
        .bind(id)
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Compare-and-swap on the refresh slot. Returns whether a row changed.
pub async fn rotate_refresh_token(
    pool: &PgPool,
    id: Uuid,
    current_hash: &str,
    next_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET refresh_token_hash = $3
         WHERE id = $1 AND refresh_token_hash = $2",
    )
    .bind(id)
    .bind(current_hash)
    .bind(next_hash)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_password_reset_token(
    pool: &PgPool,
    email: &str,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users
         SET reset_token_hash = $2, reset_token_expires_at = $3
         WHERE lower(email) = lower($1) RETURNING *",
    )
    .bind(email)
    .bind(token_hash)
    .bind(expires_at)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_valid_reset_token(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users
         WHERE reset_token_hash = $1 AND reset_token_expires_at > now()",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

/// Consume a reset token and set the new password in one conditional write.
pub async fn reset_password(
    pool: &PgPool,
    token_hash: &str,
    password_hash: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users
         SET password_hash = $2,
             reset_token_hash = NULL,
             reset_token_expires_at = NULL,
             refresh_token_hash = NULL,
             updated_at = now()
         WHERE reset_token_hash = $1 AND reset_token_expires_at > now()
         RETURNING *",
    )
    .bind(token_hash)
    .bind(password_hash)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
