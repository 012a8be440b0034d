use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::{
        service::{LoginOutcome, TokenPair, UserSummary},
        AuthenticatedUser,
    },
    error::{AppError, AppResult},
    state::AppState,
};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginOutcome>> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("email and password are required"));
    }

    let outcome = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(outcome))
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<UserSummary>)> {
    let user = state
        .auth
        .signup(&payload.name, &payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<TokenPair>> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::unauthorized());
    }

    let tokens = state.auth.refresh(&payload.refresh_token).await?;
    Ok(Json(tokens))
}

/// Always answers success, even for a missing or unreadable body.
pub async fn logout(
    State(state): State<AppState>,
    payload: Option<Json<RefreshRequest>>,
) -> Json<Value> {
    if let Some(Json(payload)) = payload {
        state.auth.logout(&payload.refresh_token).await;
    }
    Json(json!({ "success": true }))
}

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}
