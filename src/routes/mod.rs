use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{auth::AuthenticatedUser, rate_limit, state::AppState};

pub mod auth;
pub mod health;
pub mod participations;
pub mod reports;
pub mod users;
pub mod volunteers;
pub mod workshops;

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}

/// Trims, and treats blank strings as absent.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let allow_origin = match state.config.cors_allowed_origin.as_ref() {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|value| {
                    let trimmed = value.trim();
                    if trimmed.is_empty() {
                        return None;
                    }
                    match trimmed.parse::<HeaderValue>() {
                        Ok(header) => Some(header),
                        Err(_) => {
                            tracing::warn!(origin = trimmed, "ignoring invalid CORS origin");
                            None
                        }
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(tower_http::cors::AllowMethods::mirror_request())
        .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(&state);

    let login_route = Router::new()
        .route("/login", post(auth::login))
        .layer(middleware::from_fn_with_state(
            state.login_limiter.clone(),
            rate_limit::limit_login,
        ));

    let auth_routes = Router::new()
        .merge(login_route)
        .route("/signup", post(auth::signup))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let users_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        );

    let volunteers_routes = Router::new()
        .route(
            "/",
            get(volunteers::list_volunteers).post(volunteers::create_volunteer),
        )
        .route(
            "/:id",
            get(volunteers::get_volunteer)
                .put(volunteers::update_volunteer)
                .delete(volunteers::delete_volunteer),
        )
        .route("/:id/exit", put(volunteers::exit_volunteer))
        .route("/:id/term", get(volunteers::volunteer_term));

    let workshops_routes = Router::new()
        .route(
            "/",
            get(workshops::list_workshops).post(workshops::create_workshop),
        )
        .route(
            "/:id",
            get(workshops::get_workshop)
                .put(workshops::update_workshop)
                .delete(workshops::delete_workshop),
        );

    let participations_routes = Router::new()
        .route(
            "/",
            get(participations::list_participations).post(participations::create_participation),
        )
        .route(
            "/volunteer/:id",
            get(participations::list_by_volunteer),
        )
        .route("/:id", delete(participations::delete_participation));

    let reports_routes = Router::new()
        .route(
            "/volunteers/active-count",
            get(reports::active_volunteers_count),
        )
        .route(
            "/workshops/active-count",
            get(reports::workshops_with_participations_count),
        )
        .route(
            "/workshops/:id/participants-count",
            get(reports::workshop_participants_count),
        );

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/users", users_routes)
        .nest("/volunteers", volunteers_routes)
        .nest("/workshops", workshops_routes)
        .nest("/participations", participations_routes)
        .nest("/reports", reports_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/auth", auth_routes)
        .route("/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
