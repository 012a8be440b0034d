use std::{num::NonZeroU32, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};

use crate::error::AppError;

/// Process-wide limiter shared by every login attempt.
pub type LoginRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Allows `attempts` logins in a burst, replenished evenly over `window_secs`.
pub fn create_login_rate_limiter(attempts: u32, window_secs: u64) -> Result<LoginRateLimiter> {
    let burst = NonZeroU32::new(attempts).ok_or_else(|| anyhow!("login attempts must be > 0"))?;
    let period = Duration::from_millis((window_secs.max(1) * 1000) / u64::from(attempts));
    let quota = Quota::with_period(period)
        .ok_or_else(|| anyhow!("login rate limit window must be > 0"))?
        .allow_burst(burst);

    Ok(Arc::new(RateLimiter::direct(quota)))
}

pub async fn limit_login(
    State(limiter): State<LoginRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check() {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!("login rate limit exceeded");
            AppError::too_many_requests().into_response()
        }
    }
}
