use anyhow::{anyhow, ensure, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;
use volunteer_admin::config::AppConfig;
use volunteer_admin::rate_limit::create_login_rate_limiter;
use volunteer_admin::repository::Repositories;
use volunteer_admin::routes;
use volunteer_admin::state::AppState;

#[allow(dead_code)]
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-pass";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: Value,
}

#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: None,
        database_max_pool_size: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        jwt_secret: "test-secret".to_string(),
        jwt_issuer: "test-issuer".to_string(),
        jwt_audience: "test-audience".to_string(),
        jwt_refresh_audience: "test-refresh".to_string(),
        access_token_expiry_minutes: 60,
        refresh_token_expiry_days: 7,
        cors_allowed_origin: None,
        admin_seed_enabled: false,
        admin_email: ADMIN_EMAIL.to_string(),
        admin_password: ADMIN_PASSWORD.to_string(),
        admin_name: "Admin".to_string(),
        login_rate_limit_attempts: 1000,
        login_rate_limit_window_secs: 60,
    }
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Result<Self> {
        let limiter = create_login_rate_limiter(
            config.login_rate_limit_attempts,
            config.login_rate_limit_window_secs,
        )?;
        let state = AppState::new(config, Repositories::in_memory(), limiter);
        let router = routes::create_router(state.clone());
        Ok(Self { state, router })
    }

    pub async fn insert_user(
        &self,
        email: &str,
        password: &str,
        is_super_admin: bool,
    ) -> Result<Uuid> {
        let user = self
            .state
            .auth
            .create_user("Test User", email, password, is_super_admin)
            .await
            .map_err(|err| anyhow!("failed to insert user: {err}"))?;
        Ok(user.id)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let response = self
            .post_json(
                "/auth/login",
                &json!({ "email": email, "password": password }),
                None,
            )
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );
        read_json(response).await
    }

    /// Seeds a super admin and returns its access token.
    pub async fn admin_token(&self) -> Result<String> {
        self.insert_user(ADMIN_EMAIL, ADMIN_PASSWORD, true).await?;
        Ok(self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await?.token)
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PUT, path, payload, token).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let builder = Request::builder().method(Method::DELETE).uri(path);
        let builder = if let Some(token) = token {
            builder.header("authorization", format!("Bearer {token}"))
        } else {
            builder
        };
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    /// POSTs and returns the created record's `id`, failing on any non-201.
    #[allow(dead_code)]
    pub async fn create(&self, path: &str, payload: &Value, token: &str) -> Result<Uuid> {
        let response = self.post_json(path, payload, Some(token)).await?;
        let status = response.status();
        let body: Value = read_json(response).await?;
        ensure!(
            status == StatusCode::CREATED,
            "create {path} failed with {status}: {body}"
        );
        let id = body["id"]
            .as_str()
            .ok_or_else(|| anyhow!("response has no id: {body}"))?;
        Ok(Uuid::parse_str(id)?)
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn read_json<T: DeserializeOwned>(response: hyper::Response<Body>) -> Result<T> {
    let body = body_to_vec(response.into_body()).await?;
    Ok(serde_json::from_slice(&body)?)
}
