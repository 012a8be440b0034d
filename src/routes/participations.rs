use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult, ServiceError};
use crate::models::{Participation, ParticipationRole};
use crate::repository::ParticipationFilter;
use crate::routes::{clean, to_iso};
use crate::rules::CreateParticipation;
use crate::state::AppState;
use crate::utils::json::normalize_participation_payload;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationListQuery {
    pub volunteer_id: Option<Uuid>,
    pub workshop_id: Option<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParticipationRequest {
    pub volunteer_id: Uuid,
    pub workshop_id: Uuid,
    pub date: NaiveDate,
    pub role: Option<ParticipationRole>,
    pub hours: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationResponse {
    pub id: Uuid,
    pub volunteer_id: Uuid,
    pub workshop_id: Uuid,
    pub date: NaiveDate,
    pub role: Option<String>,
    pub hours: Option<i32>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Participation> for ParticipationResponse {
    fn from(participation: Participation) -> Self {
        Self {
            id: participation.id,
            volunteer_id: participation.volunteer_id,
            workshop_id: participation.workshop_id,
            date: participation.date,
            role: participation.role,
            hours: participation.hours,
            notes: participation.notes,
            created_at: to_iso(participation.created_at),
            updated_at: to_iso(participation.updated_at),
        }
    }
}

async fn load(
    state: &AppState,
    filter: ParticipationFilter,
) -> AppResult<Json<Vec<ParticipationResponse>>> {
    let rows = state.repos.participations.list(filter).await?;
    Ok(Json(rows.into_iter().map(ParticipationResponse::from).collect()))
}

pub async fn list_participations(
    State(state): State<AppState>,
    Query(params): Query<ParticipationListQuery>,
) -> AppResult<Json<Vec<ParticipationResponse>>> {
    load(
        &state,
        ParticipationFilter {
            volunteer_id: params.volunteer_id,
            workshop_id: params.workshop_id,
        },
    )
    .await
}

pub async fn list_by_volunteer(
    State(state): State<AppState>,
    Path(volunteer_id): Path<Uuid>,
) -> AppResult<Json<Vec<ParticipationResponse>>> {
    load(
        &state,
        ParticipationFilter {
            volunteer_id: Some(volunteer_id),
            workshop_id: None,
        },
    )
    .await
}

/// Missing parents and duplicate links are both reported as 400 here.
pub async fn create_participation(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<ParticipationResponse>)> {
    let payload: CreateParticipationRequest =
        serde_json::from_value(normalize_participation_payload(body))?;

    let input = CreateParticipation {
        volunteer_id: payload.volunteer_id,
        workshop_id: payload.workshop_id,
        date: payload.date,
        role: payload.role,
        hours: payload.hours,
        notes: clean(payload.notes),
    };

    let created = state
        .rules
        .create_participation(input)
        .await
        .map_err(|err| match err {
            ServiceError::NotFound(_) | ServiceError::Conflict(_) => {
                AppError::bad_request(err.to_string())
            }
            other => other.into(),
        })?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn delete_participation(
    State(state): State<AppState>,
    Path(participation_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    state.rules.delete_participation(participation_id).await?;
    Ok(Json(json!({ "success": true })))
}
