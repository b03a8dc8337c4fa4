use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{NewTrend, Trend, TrendFilter, TrendUpdate};
use crate::routes::{Envelope, json_body};
use crate::state::SharedState;

const DEFAULT_LIMIT: i64 = 50;
const DEFAULT_SHORT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;
const MAX_BULK: usize = 100;
const RECENT_DAYS: i64 = 30;

#[derive(Deserialize, Default)]
pub struct ListQuery {
    pub domain: Option<String>,
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateTrend {
    pub domain: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
}

#[derive(Deserialize)]
pub struct BulkCreate {
    pub trends: Option<Vec<CreateTrend>>,
}

/// Anonymous callers see every domain. Signed-in callers whose profile names
/// a domain get that domain unless they ask for another one.
pub async fn list(
    auth: Option<AuthUser>,
    State(state): State<SharedState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Envelope<Vec<Trend>>>, AppError> {
    let query = list_query(query)?;

    let mut domain = trimmed(query.domain);
    if domain.is_none() {
        if let Some(auth) = auth {
            domain = state
                .stores
                .profiles
                .find_by_user(auth.user_id)
                .await?
                .and_then(|profile| trimmed(profile.domain));
        }
    }

    let filter = TrendFilter {
        domain,
        search: trimmed(query.q),
        created_after: None,
        limit: clamp_limit(query.limit, DEFAULT_LIMIT),
        offset: query.offset.unwrap_or(0).max(0),
    };

    let trends = state.stores.trends.list(&filter).await?;
    Ok(Json(Envelope::data(trends)))
}

/// Trends created in the last 30 days, newest first.
pub async fn recent(
    State(state): State<SharedState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Envelope<Vec<Trend>>>, AppError> {
    let query = list_query(query)?;

    let filter = TrendFilter {
        created_after: Some(Utc::now() - Duration::days(RECENT_DAYS)),
        limit: clamp_limit(query.limit, DEFAULT_SHORT_LIMIT),
        ..Default::default()
    };

    let trends = state.stores.trends.list(&filter).await?;
    Ok(Json(Envelope::data(trends)))
}

pub async fn search(
    State(state): State<SharedState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Envelope<Vec<Trend>>>, AppError> {
    let query = list_query(query)?;
    let Some(term) = trimmed(query.q) else {
        return Err(AppError::Validation("Search query is required".to_string()));
    };

    let filter = TrendFilter {
        search: Some(term),
        limit: clamp_limit(query.limit, DEFAULT_SHORT_LIMIT),
        ..Default::default()
    };

    let trends = state.stores.trends.list(&filter).await?;
    Ok(Json(Envelope::data(trends)))
}

pub async fn domains(
    State(state): State<SharedState>,
) -> Result<Json<Envelope<Vec<String>>>, AppError> {
    let domains = state.stores.trends.domains().await?;
    Ok(Json(Envelope::data(domains)))
}

pub async fn get(
    State(state): State<SharedState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Envelope<Trend>>, AppError> {
    let id = trend_id(id)?;
    let trend = state
        .stores
        .trends
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Trend not found".to_string()))?;

    Ok(Json(Envelope::data(trend)))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    payload: Result<Json<CreateTrend>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Trend>>), AppError> {
    let new_trend = new_trend(json_body(payload)?)?;
    let trend = state.stores.trends.create(new_trend).await?;

    tracing::info!(user_id = %auth.user_id, trend_id = %trend.id, "Trend created");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message("Trend created successfully", trend)),
    ))
}

/// All-or-nothing: one invalid entry rejects the whole batch.
pub async fn bulk_create(
    auth: AuthUser,
    State(state): State<SharedState>,
    payload: Result<Json<BulkCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Vec<Trend>>>), AppError> {
    let req = json_body(payload)?;

    let items = req.trends.unwrap_or_default();
    if items.is_empty() {
        return Err(AppError::Validation("Trends array is required".to_string()));
    }
    if items.len() > MAX_BULK {
        return Err(AppError::Validation(format!(
            "At most {MAX_BULK} trends can be created at once"
        )));
    }

    let new_trends = items
        .into_iter()
        .map(new_trend)
        .collect::<Result<Vec<_>, _>>()?;

    let trends = state.stores.trends.create_many(new_trends).await?;

    tracing::info!(user_id = %auth.user_id, count = trends.len(), "Trends bulk created");
    let message = format!("{} trends created successfully", trends.len());
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(&message, trends)),
    ))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<TrendUpdate>, JsonRejection>,
) -> Result<Json<Envelope<Trend>>, AppError> {
    let id = trend_id(id)?;
    let req = json_body(payload)?;

    // An explicit null or a blank string clears a nullable field.
    let changes = TrendUpdate {
        domain: req.domain.map(trimmed),
        title: trimmed(req.title),
        description: req.description.map(trimmed),
        source: req.source.map(trimmed),
    };

    let trend = state
        .stores
        .trends
        .update(id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Trend not found".to_string()))?;

    tracing::info!(user_id = %auth.user_id, trend_id = %trend.id, "Trend updated");
    Ok(Json(Envelope::with_message("Trend updated successfully", trend)))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Envelope<()>>, AppError> {
    let id = trend_id(id)?;

    if !state.stores.trends.delete(id).await? {
        return Err(AppError::NotFound("Trend not found".to_string()));
    }

    tracing::info!(user_id = %auth.user_id, trend_id = %id, "Trend deleted");
    Ok(Json(Envelope::message("Trend deleted successfully")))
}

fn new_trend(req: CreateTrend) -> Result<NewTrend, AppError> {
    let title = trimmed(req.title)
        .ok_or_else(|| AppError::Validation("Trend title is required".to_string()))?;

    Ok(NewTrend {
        domain: trimmed(req.domain),
        title,
        description: trimmed(req.description),
        source: trimmed(req.source),
    })
}

fn list_query(query: Result<Query<ListQuery>, QueryRejection>) -> Result<ListQuery, AppError> {
    query
        .map(|Query(query)| query)
        .map_err(|e| AppError::Validation(e.body_text()))
}

fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

fn trend_id(id: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    id.map(|Path(id)| id)
        .map_err(|_| AppError::Validation("Invalid trend id".to_string()))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
