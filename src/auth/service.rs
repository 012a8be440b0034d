use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::jwt::{JwtService, SessionClaims};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{ConflictKind, ServiceError, ServiceResult, StoreError};
use crate::models::{NewUser, User};
use crate::repository::UserRepository;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

/// User fields safe to hand back to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_super_admin: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            is_super_admin: user.is_super_admin,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserSummary,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt: JwtService,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Digest kept in the refresh slot; the raw token never reaches storage.
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn session_for(user: &User) -> SessionClaims {
    SessionClaims {
        subject_id: user.id,
        email: user.email.clone(),
        display_name: user.name.clone(),
        is_super_admin: user.is_super_admin,
    }
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, jwt: JwtService) -> Self {
        Self { users, jwt }
    }

    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<LoginOutcome> {
        let email = normalize_email(email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        match verify_password(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(ServiceError::InvalidCredentials),
            Err(err) => {
                tracing::warn!(user_id = %user.id, error = %err, "stored password hash is unreadable");
                return Err(ServiceError::InvalidCredentials);
            }
        }

        let tokens = self.issue_pair(&session_for(&user))?;
        let digest = hash_refresh_token(&tokens.refresh_token);
        self.users
            .record_login(user.id, &digest, Utc::now().naive_utc())
            .await?;

        tracing::info!(user_id = %user.id, "user logged in");
        Ok(LoginOutcome {
            tokens,
            user: UserSummary::from(&user),
        })
    }

    /// Rotates the presented refresh token. The stored slot must still hold
    /// the presented token when the new one is written, otherwise the
    /// rotation is refused.
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<TokenPair> {
        let presented = hash_refresh_token(refresh_token);
        let holder = self
            .users
            .find_by_refresh_token(&presented)
            .await?
            .ok_or(ServiceError::InvalidRefreshToken)?;

        // A stored match is not enough; the token itself must still verify.
        let claims = self
            .jwt
            .verify_refresh_token(refresh_token)
            .map_err(|err| {
                tracing::debug!(
                    user_id = %holder.id,
                    error = %err,
                    "stored refresh token failed verification"
                );
                ServiceError::ExpiredRefreshToken
            })?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        if user.id != holder.id {
            return Err(ServiceError::InvalidRefreshToken);
        }

        let tokens = self.issue_pair(&session_for(&user))?;
        let replacement = hash_refresh_token(&tokens.refresh_token);
        let swapped = self
            .users
            .replace_refresh_token(user.id, &presented, Some(&replacement))
            .await?;
        if !swapped {
            tracing::warn!(user_id = %user.id, "refresh token superseded during rotation");
            return Err(ServiceError::InvalidRefreshToken);
        }

        Ok(tokens)
    }

    /// Never fails. Clears the slot only while it still holds this token.
    pub async fn logout(&self, refresh_token: &str) {
        let claims = match self.jwt.verify_refresh_token(refresh_token) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::debug!(error = %err, "logout with unverifiable refresh token");
                return;
            }
        };

        let digest = hash_refresh_token(refresh_token);
        match self
            .users
            .replace_refresh_token(claims.sub, &digest, None)
            .await
        {
            Ok(true) => tracing::info!(user_id = %claims.sub, "user logged out"),
            Ok(false) => {
                tracing::debug!(user_id = %claims.sub, "logout token no longer current")
            }
            Err(err) => {
                tracing::warn!(user_id = %claims.sub, error = %err, "failed to clear refresh token")
            }
        }
    }

    pub fn verify_access(&self, token: &str) -> ServiceResult<SessionClaims> {
        self.jwt
            .verify_access_token(token)
            .map(|claims| claims.session())
            .map_err(|_| ServiceError::Unauthorized)
    }

    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> ServiceResult<UserSummary> {
        let user = self.create_user(name, email, password, false).await?;
        Ok(UserSummary::from(&user))
    }

    /// Shared by signup, user management and the admin seed.
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        is_super_admin: bool,
    ) -> ServiceResult<User> {
        let name = name.trim();
        let email = normalize_email(email);
        if name.is_empty() {
            return Err(ServiceError::Validation("name is required".into()));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::Validation("a valid email is required".into()));
        }
        if password.is_empty() {
            return Err(ServiceError::Validation("password is required".into()));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict(ConflictKind::DuplicateEmail));
        }

        let password_hash = hash_password(password).map_err(ServiceError::Internal)?;
        let new_user = NewUser {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            email,
            password_hash,
            is_super_admin,
        };

        match self.users.insert(new_user).await {
            Ok(user) => Ok(user),
            Err(StoreError::UniqueViolation(_)) => {
                Err(ServiceError::Conflict(ConflictKind::DuplicateEmail))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn issue_pair(&self, session: &SessionClaims) -> ServiceResult<TokenPair> {
        Ok(TokenPair {
            token: self.jwt.generate_access_token(session)?,
            refresh_token: self.jwt.generate_refresh_token(session)?,
        })
    }
}
