use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::{self, Display};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn too_many_requests() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "too many requests, please try again later",
        )
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Kinds of record the consistency checks refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Volunteer,
    Workshop,
    Participation,
}

impl Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::User => "user",
            Entity::Volunteer => "volunteer",
            Entity::Workshop => "workshop",
            Entity::Participation => "participation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    DuplicateParticipation,
    DuplicateEmail,
}

impl Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::DuplicateParticipation => f.write_str("participation already exists"),
            ConflictKind::DuplicateEmail => f.write_str("email already in use"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("database error: {0}")]
    Database(diesel::result::Error),
    #[error("database pool error: {0}")]
    Pool(String),
    #[error("storage task failed: {0}")]
    Task(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => StoreError::UniqueViolation(info.message().to_string()),
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("refresh token expired")]
    ExpiredRefreshToken,
    #[error("user not found")]
    UserNotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("{0}")]
    Conflict(ConflictKind),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("internal error: {0}")]
    Internal(anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<ServiceError> for AppError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::InvalidCredentials
            | ServiceError::InvalidRefreshToken
            | ServiceError::ExpiredRefreshToken
            | ServiceError::UserNotFound => {
                AppError::new(StatusCode::UNAUTHORIZED, value.to_string())
            }
            ServiceError::Unauthorized => AppError::unauthorized(),
            ServiceError::Forbidden => AppError::forbidden(),
            ServiceError::NotFound(entity) => {
                AppError::new(StatusCode::NOT_FOUND, format!("{entity} not found"))
            }
            ServiceError::Conflict(kind) => AppError::conflict(kind.to_string()),
            ServiceError::Validation(message) => AppError::bad_request(message),
            ServiceError::Store(err) => AppError::from(err),
            ServiceError::Token(err) => AppError::internal(err),
            ServiceError::Internal(err) => {
                tracing::error!(error = %err, "internal failure");
                AppError::internal(err)
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        tracing::error!(error = %value, "storage failure");
        AppError::internal(value)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::bad_request(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_share_status() {
        let missing: AppError = ServiceError::InvalidCredentials.into();
        let expired: AppError = ServiceError::ExpiredRefreshToken.into();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn maps_domain_errors_to_statuses() {
        let not_found: AppError = ServiceError::NotFound(Entity::Volunteer).into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let conflict: AppError =
            ServiceError::Conflict(ConflictKind::DuplicateParticipation).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let invalid: AppError = ServiceError::Validation("bad".into()).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let internal: AppError = ServiceError::Internal(anyhow::anyhow!("hasher broke")).into();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unique_violation_is_recognised() {
        let err = StoreError::UniqueViolation("participations_unique".into());
        assert!(err.to_string().contains("participations_unique"));
    }
}
