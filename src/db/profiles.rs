use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Profile, ProfileInput};

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    input: &ProfileInput,
) -> Result<Profile, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        "INSERT INTO profiles (user_id, domain, title, experience_level, bio)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(user_id)
    .bind(input.domain.as_deref())
    .bind(input.title.as_deref())
    .bind(input.experience_level.as_deref())
    .bind(input.bio.as_deref())
    .fetch_one(executor)
    .await
}

pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn upsert(
    pool: &PgPool,
    user_id: Uuid,
    input: &ProfileInput,
) -> Result<Profile, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        "INSERT INTO profiles (user_id, domain, title, experience_level, bio)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (user_id) DO UPDATE SET
             domain = COALESCE(EXCLUDED.domain, profiles.domain),
             title = COALESCE(EXCLUDED.title, profiles.title),
             experience_level = COALESCE(EXCLUDED.experience_level, profiles.experience_level),
             bio = COALESCE(EXCLUDED.bio, profiles.bio),
             updated_at = now()
         RETURNING *",
    )
    .bind(user_id)
    .bind(input.domain.as_deref())
    .bind(input.title.as_deref())
    .bind(input.experience_level.as_deref())
    .bind(input.bio.as_deref())
    .fetch_one(pool)
    .await
}
