pub mod jwt;
pub mod password;
pub mod service;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub subject_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub is_super_admin: bool,
}

impl AuthenticatedUser {
    pub fn require_super_admin(&self) -> Result<(), AppError> {
        if self.is_super_admin {
            Ok(())
        } else {
            Err(AppError::forbidden())
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let session = state
            .auth
            .verify_access(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        Ok(AuthenticatedUser {
            subject_id: session.subject_id,
            email: session.email,
            display_name: session.display_name,
            is_super_admin: session.is_super_admin,
        })
    }
}
