use std::sync::Arc;

use crate::{
    auth::{jwt::JwtService, service::AuthService},
    config::AppConfig,
    rate_limit::LoginRateLimiter,
    repository::Repositories,
    rules::ConsistencyRules,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repos: Repositories,
    pub auth: AuthService,
    pub rules: ConsistencyRules,
    pub login_limiter: LoginRateLimiter,
}

impl AppState {
    pub fn new(config: AppConfig, repos: Repositories, login_limiter: LoginRateLimiter) -> Self {
        let jwt = JwtService::from_config(&config);
        let auth = AuthService::new(repos.users.clone(), jwt);
        let rules = ConsistencyRules::new(repos.clone());
        Self {
            config: Arc::new(config),
            repos,
            auth,
            rules,
            login_limiter,
        }
    }
}
