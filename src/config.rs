use std::env;

use anyhow::{Context, Result};
use url::Url;

use crate::db::DEFAULT_MAX_POOL_SIZE;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// `None` selects the process-local store.
    pub database_url: Option<String>,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_refresh_audience: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
    pub cors_allowed_origin: Option<String>,
    pub admin_seed_enabled: bool,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_name: String,
    pub login_rate_limit_attempts: u32,
    pub login_rate_limit_window_secs: u64,
}

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "volunteer-admin".to_string());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "volunteer-admin-clients".to_string());
        let jwt_refresh_audience = env::var("JWT_REFRESH_AUDIENCE")
            .unwrap_or_else(|_| "volunteer-admin-refresh".to_string());
        let access_token_expiry_minutes = env::var("ACCESS_TOKEN_EXPIRY_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("ACCESS_TOKEN_EXPIRY_MINUTES must be an integer")?;
        let refresh_token_expiry_days = env::var("REFRESH_TOKEN_EXPIRY_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .context("REFRESH_TOKEN_EXPIRY_DAYS must be an integer")?;
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let admin_seed_enabled = env::var("ADMIN_SEED_ENABLED")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);
        let admin_email =
            env::var("ADMIN_EMAIL").unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string());
        let admin_password =
            env::var("ADMIN_PASSWORD").unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());
        let admin_name = env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string());
        let login_rate_limit_attempts = env::var("LOGIN_RATE_LIMIT_ATTEMPTS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("LOGIN_RATE_LIMIT_ATTEMPTS must be an integer")?;
        let login_rate_limit_window_secs = env::var("LOGIN_RATE_LIMIT_WINDOW_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("LOGIN_RATE_LIMIT_WINDOW_SECS must be an integer")?;

        Ok(Self {
            database_url,
            database_max_pool_size,
            server_host,
            server_port,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            jwt_refresh_audience,
            access_token_expiry_minutes,
            refresh_token_expiry_days,
            cors_allowed_origin,
            admin_seed_enabled,
            admin_email,
            admin_password,
            admin_name,
            login_rate_limit_attempts,
            login_rate_limit_window_secs,
        })
    }

    pub fn redacted_database_url(&self) -> String {
        match &self.database_url {
            Some(raw) => redact_database_url(raw),
            None => "memory".to_string(),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            let _ = parsed.set_password(Some("*****"));
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
