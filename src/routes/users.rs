use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::auth::service::normalize_email;
use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult, ConflictKind, Entity, ServiceError, StoreError};
use crate::models::{User, UserChanges};
use crate::repository::{Page, PageRequest, UserFilter};
use crate::routes::to_iso;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserListQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_super_admin: bool,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_super_admin: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_super_admin: bool,
    pub last_login_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            is_super_admin: user.is_super_admin,
            last_login_at: user.last_login_at.map(to_iso),
            created_at: to_iso(user.created_at),
            updated_at: to_iso(user.updated_at),
        }
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UserListQuery>,
) -> AppResult<Json<Page<UserResponse>>> {
    let filter = UserFilter {
        q: params.q,
        page: PageRequest::new(params.page, params.limit),
    };
    let page = state.repos.users.list(filter).await?;
    Ok(Json(page.map(UserResponse::from)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .repos
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::from(ServiceError::NotFound(Entity::User)))?;
    Ok(Json(user.into()))
}

pub async fn create_user(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    if payload.is_super_admin {
        caller.require_super_admin()?;
    }

    let user = state
        .auth
        .create_user(
            &payload.name,
            &payload.email,
            &payload.password,
            payload.is_super_admin,
        )
        .await?;
    tracing::info!(user_id = %user.id, created_by = %caller.subject_id, "user created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    // Users may edit their own profile; everything else is super-admin only.
    if caller.subject_id != user_id || payload.is_super_admin.is_some() {
        caller.require_super_admin()?;
    }

    let mut changes = UserChanges {
        is_super_admin: payload.is_super_admin,
        ..Default::default()
    };

    if let Some(name) = payload.name {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::bad_request("name must not be empty"));
        }
        changes.name = Some(trimmed.to_owned());
    }

    if let Some(email) = payload.email {
        let email = normalize_email(&email);
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::bad_request("a valid email is required"));
        }
        if let Some(existing) = state.repos.users.find_by_email(&email).await? {
            if existing.id != user_id {
                return Err(ServiceError::Conflict(ConflictKind::DuplicateEmail).into());
            }
        }
        changes.email = Some(email);
    }

    if let Some(password) = payload.password {
        if password.is_empty() {
            return Err(AppError::bad_request("password must not be empty"));
        }
        changes.password_hash = Some(hash_password(&password)?);
    }

    let updated = match state.repos.users.update(user_id, changes).await {
        Ok(updated) => updated,
        Err(StoreError::UniqueViolation(_)) => {
            return Err(ServiceError::Conflict(ConflictKind::DuplicateEmail).into())
        }
        Err(err) => return Err(err.into()),
    };

    let user = updated.ok_or_else(|| AppError::from(ServiceError::NotFound(Entity::User)))?;
    Ok(Json(user.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    if caller.subject_id == user_id {
        return Err(AppError::bad_request("cannot delete the signed-in user"));
    }
    caller.require_super_admin()?;
    if !state.repos.users.delete(user_id).await? {
        return Err(ServiceError::NotFound(Entity::User).into());
    }
    tracing::info!(user_id = %user_id, deleted_by = %caller.subject_id, "user deleted");
    Ok(Json(json!({ "success": true })))
}
