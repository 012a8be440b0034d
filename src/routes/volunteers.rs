use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult, ConflictKind, Entity, ServiceError, StoreError};
use crate::models::{NewVolunteer, Volunteer, VolunteerChanges, VolunteerStatus};
use crate::repository::{Page, PageRequest, VolunteerFilter};
use crate::routes::{clean, to_iso};
use crate::rules::VolunteerTerm;
use crate::state::AppState;
use crate::utils::json::{double_option, normalize_volunteer_payload, split_full_name};

#[derive(Deserialize)]
pub struct VolunteerListQuery {
    pub q: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVolunteerRequest {
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<VolunteerStatus>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVolunteerRequest {
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub cpf: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    pub status: Option<VolunteerStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub emergency_contact_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub emergency_contact_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Volunteer> for VolunteerResponse {
    fn from(volunteer: Volunteer) -> Self {
        Self {
            id: volunteer.id,
            first_name: volunteer.first_name,
            last_name: volunteer.last_name,
            full_name: volunteer.full_name,
            email: volunteer.email,
            phone: volunteer.phone,
            cpf: volunteer.cpf,
            birth_date: volunteer.birth_date,
            address: volunteer.address,
            start_date: volunteer.start_date,
            end_date: volunteer.end_date,
            status: volunteer.status,
            emergency_contact_name: volunteer.emergency_contact_name,
            emergency_contact_phone: volunteer.emergency_contact_phone,
            notes: volunteer.notes,
            created_at: to_iso(volunteer.created_at),
            updated_at: to_iso(volunteer.updated_at),
        }
    }
}

fn clean_email(value: Option<String>) -> Option<String> {
    clean(value).map(|v| v.to_lowercase())
}

fn non_blank(field: &str, value: Option<String>) -> AppResult<Option<String>> {
    match value {
        Some(value) if value.trim().is_empty() => {
            Err(AppError::bad_request(format!("{field} must not be empty")))
        }
        other => Ok(other.map(|v| v.trim().to_owned())),
    }
}

fn duplicate_email(err: StoreError) -> AppError {
    match err {
        StoreError::UniqueViolation(_) => {
            ServiceError::Conflict(ConflictKind::DuplicateEmail).into()
        }
        other => other.into(),
    }
}

pub async fn list_volunteers(
    State(state): State<AppState>,
    Query(params): Query<VolunteerListQuery>,
) -> AppResult<Json<Page<VolunteerResponse>>> {
    let status = match clean(params.status) {
        Some(raw) => Some(raw.parse::<VolunteerStatus>().map_err(AppError::bad_request)?),
        None => None,
    };
    let filter = VolunteerFilter {
        q: params.q,
        status,
        page: PageRequest::new(params.page, params.limit),
    };
    let page = state.repos.volunteers.list(filter).await?;
    Ok(Json(page.map(VolunteerResponse::from)))
}

pub async fn get_volunteer(
    State(state): State<AppState>,
    Path(volunteer_id): Path<Uuid>,
) -> AppResult<Json<VolunteerResponse>> {
    let volunteer = state
        .repos
        .volunteers
        .find(volunteer_id)
        .await?
        .ok_or_else(|| AppError::from(ServiceError::NotFound(Entity::Volunteer)))?;
    Ok(Json(volunteer.into()))
}

pub async fn create_volunteer(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<VolunteerResponse>)> {
    let payload: CreateVolunteerRequest =
        serde_json::from_value(normalize_volunteer_payload(body))?;

    let full_name = clean(payload.full_name)
        .ok_or_else(|| AppError::bad_request("fullName is required"))?;
    let start_date = payload
        .start_date
        .ok_or_else(|| AppError::bad_request("startDate is required"))?;
    let (derived_first, derived_last) = split_full_name(&full_name);

    let new_volunteer = NewVolunteer {
        id: Uuid::new_v4(),
        first_name: clean(payload.first_name).unwrap_or(derived_first),
        last_name: clean(payload.last_name).unwrap_or(derived_last),
        full_name,
        email: clean_email(payload.email),
        phone: clean(payload.phone),
        cpf: clean(payload.cpf),
        birth_date: payload.birth_date,
        address: clean(payload.address),
        start_date,
        end_date: payload.end_date,
        status: payload
            .status
            .unwrap_or(VolunteerStatus::Active)
            .as_str()
            .to_owned(),
        emergency_contact_name: clean(payload.emergency_contact_name),
        emergency_contact_phone: clean(payload.emergency_contact_phone),
        notes: clean(payload.notes),
    };

    let volunteer = state
        .repos
        .volunteers
        .insert(new_volunteer)
        .await
        .map_err(duplicate_email)?;
    tracing::info!(volunteer_id = %volunteer.id, "volunteer created");
    Ok((StatusCode::CREATED, Json(volunteer.into())))
}

pub async fn update_volunteer(
    State(state): State<AppState>,
    Path(volunteer_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<VolunteerResponse>> {
    let payload: UpdateVolunteerRequest =
        serde_json::from_value(normalize_volunteer_payload(body))?;

    let mut changes = VolunteerChanges {
        email: payload.email.map(clean_email),
        phone: payload.phone.map(clean),
        cpf: payload.cpf.map(clean),
        birth_date: payload.birth_date,
        address: payload.address.map(clean),
        start_date: payload.start_date,
        end_date: payload.end_date,
        status: payload.status.map(|status| status.as_str().to_owned()),
        emergency_contact_name: payload.emergency_contact_name.map(clean),
        emergency_contact_phone: payload.emergency_contact_phone.map(clean),
        notes: payload.notes.map(clean),
        ..Default::default()
    };

    changes.full_name = non_blank("fullName", payload.full_name)?;
    changes.first_name = non_blank("firstName", payload.first_name)?;
    changes.last_name = payload.last_name.map(|v| v.trim().to_owned());

    let volunteer = state
        .repos
        .volunteers
        .update(volunteer_id, changes)
        .await
        .map_err(duplicate_email)?
        .ok_or_else(|| AppError::from(ServiceError::NotFound(Entity::Volunteer)))?;
    Ok(Json(volunteer.into()))
}

pub async fn delete_volunteer(
    State(state): State<AppState>,
    Path(volunteer_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let removed = state.rules.delete_volunteer(volunteer_id).await?;
    Ok(Json(json!({ "success": true, "removedParticipations": removed })))
}

pub async fn exit_volunteer(
    State(state): State<AppState>,
    Path(volunteer_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    state.rules.exit_volunteer(volunteer_id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn volunteer_term(
    State(state): State<AppState>,
    Path(volunteer_id): Path<Uuid>,
) -> AppResult<Json<VolunteerTerm>> {
    let term = state.rules.volunteer_term(volunteer_id).await?;
    Ok(Json(term))
}
