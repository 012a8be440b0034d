use anyhow::{Context, Result};

use crate::auth::service::{normalize_email, AuthService};
use crate::config::AppConfig;
use crate::repository::UserRepository;

/// Creates the configured super admin unless a user with that email exists.
/// Returns whether a user was created.
pub async fn ensure_admin(
    config: &AppConfig,
    users: &dyn UserRepository,
    auth: &AuthService,
) -> Result<bool> {
    if !config.admin_seed_enabled {
        tracing::debug!("admin seed disabled");
        return Ok(false);
    }

    let email = normalize_email(&config.admin_email);
    if users
        .find_by_email(&email)
        .await
        .context("failed to look up admin user")?
        .is_some()
    {
        return Ok(false);
    }

    let admin = auth
        .create_user(&config.admin_name, &email, &config.admin_password, true)
        .await
        .context("failed to create admin user")?;
    tracing::info!(user_id = %admin.id, email = %admin.email, "super admin created");
    Ok(true)
}
