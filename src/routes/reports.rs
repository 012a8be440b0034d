use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::VolunteerStatus;
use crate::state::AppState;

pub async fn active_volunteers_count(State(state): State<AppState>) -> AppResult<Json<i64>> {
    let count = state
        .repos
        .volunteers
        .count_by_status(VolunteerStatus::Active)
        .await?;
    Ok(Json(count))
}

/// Workshops with at least one participation, whatever their `is_active` flag.
pub async fn workshops_with_participations_count(
    State(state): State<AppState>,
) -> AppResult<Json<i64>> {
    let count = state.repos.participations.count_distinct_workshops().await?;
    Ok(Json(count))
}

/// Unknown workshops simply count zero participants.
pub async fn workshop_participants_count(
    State(state): State<AppState>,
    Path(workshop_id): Path<Uuid>,
) -> AppResult<Json<i64>> {
    let count = state
        .repos
        .participations
        .count_distinct_volunteers(workshop_id)
        .await?;
    Ok(Json(count))
}
