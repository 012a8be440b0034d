use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use volunteer_admin::{
    config::AppConfig, db, rate_limit::create_login_rate_limiter, repository::Repositories,
    routes, seed, state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "server",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        admin_seed = config.admin_seed_enabled,
        "loaded configuration"
    );

    let repos = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::init_pool_with_size(url, config.database_max_pool_size)?;
            db::run_migrations(&pool).await?;
            Repositories::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Repositories::in_memory()
        }
    };

    let limiter = create_login_rate_limiter(
        config.login_rate_limit_attempts,
        config.login_rate_limit_window_secs,
    )?;
    let state = AppState::new(config, repos, limiter);
    seed::ensure_admin(&state.config, state.repos.users.as_ref(), &state.auth).await?;

    let addr: SocketAddr = format!("{}:{}", state.config.server_host, state.config.server_port)
        .parse()
        .context("SERVER_HOST and SERVER_PORT must form a socket address")?;
    let app = routes::create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        tracing::info!("server received shutdown signal");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
