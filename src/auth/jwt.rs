use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::Result, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;

/// Signs and verifies both token kinds with one HS256 secret. The kinds are
/// told apart by audience, so an access token never passes as a refresh
/// token and vice versa.
#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    expiry: Duration,
    refresh_audience: String,
    refresh_expiry: Duration,
}

/// Identity carried in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub subject_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub is_super_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub is_super_admin: bool,
    pub jti: Uuid,
    pub iss: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn session(&self) -> SessionClaims {
        SessionClaims {
            subject_id: self.sub,
            email: self.email.clone(),
            display_name: self.name.clone(),
            is_super_admin: self.is_super_admin,
        }
    }
}

impl JwtService {
    pub fn new(
        secret: &str,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        expiry: Duration,
        refresh_audience: impl Into<String>,
        refresh_expiry: Duration,
    ) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            audience: audience.into(),
            expiry,
            refresh_audience: refresh_audience.into(),
            refresh_expiry,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            config.jwt_issuer.clone(),
            config.jwt_audience.clone(),
            Duration::minutes(config.access_token_expiry_minutes),
            config.jwt_refresh_audience.clone(),
            Duration::days(config.refresh_token_expiry_days),
        )
    }

    pub fn generate_access_token(&self, session: &SessionClaims) -> Result<String> {
        self.sign(session, &self.audience, self.expiry)
    }

    pub fn generate_refresh_token(&self, session: &SessionClaims) -> Result<String> {
        self.sign(session, &self.refresh_audience, self.refresh_expiry)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims> {
        self.verify(token, &self.audience)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims> {
        self.verify(token, &self.refresh_audience)
    }

    fn sign(&self, session: &SessionClaims, audience: &str, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let exp = now + ttl;
        let claims = Claims {
            sub: session.subject_id,
            email: session.email.clone(),
            name: session.display_name.clone(),
            is_super_admin: session.is_super_admin,
            jti: Uuid::new_v4(),
            iss: self.issuer.clone(),
            aud: audience.to_owned(),
            iat: now.timestamp().max(0) as usize,
            exp: exp.timestamp().max(0) as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
    }

    fn verify(&self, token: &str, audience: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(&[audience]);
        validation.set_issuer(&[self.issuer.clone()]);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    fn service(access: Duration, refresh: Duration) -> JwtService {
        JwtService::new("test-secret", "issuer", "clients", access, "refresh", refresh)
    }

    fn session() -> SessionClaims {
        SessionClaims {
            subject_id: Uuid::new_v4(),
            email: "ana@example.com".into(),
            display_name: "Ana".into(),
            is_super_admin: true,
        }
    }

    #[test]
    fn access_token_round_trips_session() {
        let jwt = service(Duration::minutes(5), Duration::days(1));
        let session = session();
        let token = jwt.generate_access_token(&session).unwrap();
        let claims = jwt.verify_access_token(&token).unwrap();
        assert_eq!(claims.session(), session);
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let jwt = service(Duration::minutes(5), Duration::days(1));
        let session = session();
        let access = jwt.generate_access_token(&session).unwrap();
        let refresh = jwt.generate_refresh_token(&session).unwrap();

        assert!(jwt.verify_refresh_token(&access).is_err());
        assert!(jwt.verify_access_token(&refresh).is_err());
    }

    #[test]
    fn tokens_minted_together_differ() {
        let jwt = service(Duration::minutes(5), Duration::days(1));
        let session = session();
        let first = jwt.generate_refresh_token(&session).unwrap();
        let second = jwt.generate_refresh_token(&session).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = service(Duration::minutes(5), Duration::minutes(-10));
        let token = jwt.generate_refresh_token(&session()).unwrap();
        let err = jwt.verify_refresh_token(&token).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let jwt = service(Duration::minutes(5), Duration::days(1));
        let other = JwtService::new(
            "other-secret",
            "issuer",
            "clients",
            Duration::minutes(5),
            "refresh",
            Duration::days(1),
        );
        let token = other.generate_access_token(&session()).unwrap();
        assert!(jwt.verify_access_token(&token).is_err());
    }
}
