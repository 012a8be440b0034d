use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult, Entity, ServiceError};
use crate::models::{NewWorkshop, Workshop, WorkshopChanges};
use crate::repository::{Page, PageRequest, WorkshopFilter};
use crate::routes::{clean, to_iso};
use crate::state::AppState;
use crate::utils::json::{double_option, normalize_workshop_payload};

const TIME_FORMAT: &str = "%H:%M";

#[derive(Deserialize)]
pub struct WorkshopListQuery {
    pub q: Option<String>,
    /// `active` or `inactive`.
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkshopRequest {
    pub name: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub weekday: Option<i32>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub capacity: Option<i32>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkshopRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub weekday: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub capacity: Option<Option<i32>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub weekday: Option<i32>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub capacity: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Workshop> for WorkshopResponse {
    fn from(workshop: Workshop) -> Self {
        Self {
            id: workshop.id,
            name: workshop.name,
            description: workshop.description,
            is_active: workshop.is_active,
            weekday: workshop.weekday,
            start_time: workshop.start_time.map(|t| t.format(TIME_FORMAT).to_string()),
            end_time: workshop.end_time.map(|t| t.format(TIME_FORMAT).to_string()),
            capacity: workshop.capacity,
            created_at: to_iso(workshop.created_at),
            updated_at: to_iso(workshop.updated_at),
        }
    }
}

fn parse_time(field: &str, value: Option<String>) -> AppResult<Option<NaiveTime>> {
    match clean(value) {
        Some(raw) => NaiveTime::parse_from_str(&raw, TIME_FORMAT)
            .map(Some)
            .map_err(|_| AppError::bad_request(format!("{field} must use HH:MM"))),
        None => Ok(None),
    }
}

fn check_weekday(weekday: Option<i32>) -> AppResult<Option<i32>> {
    match weekday {
        Some(day) if !(0..=6).contains(&day) => {
            Err(AppError::bad_request("weekday must be between 0 and 6"))
        }
        other => Ok(other),
    }
}

fn check_capacity(capacity: Option<i32>) -> AppResult<Option<i32>> {
    match capacity {
        Some(value) if value < 0 => Err(AppError::bad_request("capacity must not be negative")),
        other => Ok(other),
    }
}

pub async fn list_workshops(
    State(state): State<AppState>,
    Query(params): Query<WorkshopListQuery>,
) -> AppResult<Json<Page<WorkshopResponse>>> {
    let is_active = match clean(params.status).map(|s| s.to_lowercase()).as_deref() {
        None => None,
        Some("active") => Some(true),
        Some("inactive") => Some(false),
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "unknown workshop status {other}"
            )))
        }
    };
    let filter = WorkshopFilter {
        q: params.q,
        is_active,
        page: PageRequest::new(params.page, params.limit),
    };
    let page = state.repos.workshops.list(filter).await?;
    Ok(Json(page.map(WorkshopResponse::from)))
}

pub async fn get_workshop(
    State(state): State<AppState>,
    Path(workshop_id): Path<Uuid>,
) -> AppResult<Json<WorkshopResponse>> {
    let workshop = state
        .repos
        .workshops
        .find(workshop_id)
        .await?
        .ok_or_else(|| AppError::from(ServiceError::NotFound(Entity::Workshop)))?;
    Ok(Json(workshop.into()))
}

pub async fn create_workshop(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<WorkshopResponse>)> {
    let payload: CreateWorkshopRequest =
        serde_json::from_value(normalize_workshop_payload(body))?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let new_workshop = NewWorkshop {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        description: clean(payload.description),
        is_active: payload.is_active.unwrap_or(true),
        weekday: check_weekday(payload.weekday)?,
        start_time: parse_time("startTime", payload.start_time)?,
        end_time: parse_time("endTime", payload.end_time)?,
        capacity: check_capacity(payload.capacity)?,
    };

    let workshop = state.repos.workshops.insert(new_workshop).await?;
    tracing::info!(workshop_id = %workshop.id, "workshop created");
    Ok((StatusCode::CREATED, Json(workshop.into())))
}

pub async fn update_workshop(
    State(state): State<AppState>,
    Path(workshop_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<WorkshopResponse>> {
    let payload: UpdateWorkshopRequest =
        serde_json::from_value(normalize_workshop_payload(body))?;

    let name = match payload.name {
        Some(name) if name.trim().is_empty() => {
            return Err(AppError::bad_request("name must not be empty"))
        }
        other => other.map(|n| n.trim().to_owned()),
    };

    let changes = WorkshopChanges {
        name,
        description: payload.description.map(clean),
        is_active: payload.is_active,
        weekday: payload.weekday.map(check_weekday).transpose()?,
        start_time: payload
            .start_time
            .map(|v| parse_time("startTime", v))
            .transpose()?,
        end_time: payload
            .end_time
            .map(|v| parse_time("endTime", v))
            .transpose()?,
        capacity: payload.capacity.map(check_capacity).transpose()?,
    };

    let workshop = state
        .repos
        .workshops
        .update(workshop_id, changes)
        .await?
        .ok_or_else(|| AppError::from(ServiceError::NotFound(Entity::Workshop)))?;
    Ok(Json(workshop.into()))
}

pub async fn delete_workshop(
    State(state): State<AppState>,
    Path(workshop_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let removed = state.rules.delete_workshop(workshop_id).await?;
    Ok(Json(json!({ "success": true, "removedParticipations": removed })))
}
