use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub id: Uuid,
    pub domain: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTrend {
    pub domain: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub source: Option<String>,
}

/// Partial update. For the nullable columns the outer `None` keeps the
/// stored value and `Some(None)` (JSON `null`) clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendUpdate {
    #[serde(default, deserialize_with = "present")]
    pub domain: Option<Option<String>>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub source: Option<Option<String>>,
}

/// Marks a field that appeared in the payload, even as `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default)]
pub struct TrendFilter {
    pub domain: Option<String>,
    pub search: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}
