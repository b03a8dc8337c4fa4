use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewTrend, Trend, TrendFilter, TrendUpdate};

/// `ILIKE` pattern matching `term` literally anywhere in the column.
pub fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub async fn list(pool: &PgPool, filter: &TrendFilter) -> Result<Vec<Trend>, sqlx::Error> {
    let pattern = filter.search.as_deref().map(contains_pattern);

    sqlx::query_as::<_, Trend>(
        r"SELECT * FROM trends
         WHERE ($1::text IS NULL OR domain = $1)
           AND ($2::text IS NULL
                OR title ILIKE $2 ESCAPE '\'
                OR description ILIKE $2 ESCAPE '\')
           AND ($3::timestamptz IS NULL OR created_at >= $3)
         ORDER BY created_at DESC, id DESC
         LIMIT $4 OFFSET $5",
    )
    .bind(filter.domain.as_deref())
    .bind(pattern)
    .bind(filter.created_after)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await
}

pub async fn domains(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT domain FROM trends WHERE domain IS NOT NULL ORDER BY domain",
    )
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Trend>, sqlx::Error> {
    sqlx::query_as::<_, Trend>("SELECT * FROM trends WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    trend: &NewTrend,
) -> Result<Trend, sqlx::Error> {
    sqlx::query_as::<_, Trend>(
        "INSERT INTO trends (domain, title, description, source)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(trend.domain.as_deref())
    .bind(&trend.title)
    .bind(trend.description.as_deref())
    .bind(trend.source.as_deref())
    .fetch_one(executor)
    .await
}

pub async fn create_many(pool: &PgPool, trends: &[NewTrend]) -> Result<Vec<Trend>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let mut created = Vec::with_capacity(trends.len());
    for trend in trends {
        created.push(create(&mut *tx, trend).await?);
    }

    tx.commit().await?;
    Ok(created)
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    changes: &TrendUpdate,
) -> Result<Option<Trend>, sqlx::Error> {
    // Nullable columns take a (present, value) pair so that null can clear them.
    sqlx::query_as::<_, Trend>(
        "UPDATE trends
         SET domain = CASE WHEN $2 THEN $3 ELSE domain END,
             title = COALESCE($4, title),
             description = CASE WHEN $5 THEN $6 ELSE description END,
             source = CASE WHEN $7 THEN $8 ELSE source END,
             updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(changes.domain.is_some())
    .bind(changes.domain.clone().flatten())
    .bind(changes.title.as_deref())
    .bind(changes.description.is_some())
    .bind(changes.description.clone().flatten())
    .bind(changes.source.is_some())
    .bind(changes.source.clone().flatten())
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM trends WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
