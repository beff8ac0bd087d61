//! HTTP route table.

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post};

use crate::handlers::{auth, health, invites, logs, registry, services};
use crate::middleware;
use crate::state::AppState;

/// Build the API router. Dev mode swaps real bearer authentication for
/// the fixed dev tenant (while still honoring a valid bearer key).
pub fn build_router(state: AppState) -> Router {
    let mut protected = Router::new()
        .route(
            "/services",
            get(services::list_services).post(services::create_service),
        )
        .route(
            "/services/{id}",
            get(services::get_service).delete(services::delete_service),
        )
        .route("/services/{id}/logs", get(logs::stream_logs))
        .route(
            "/auth/api-keys",
            post(auth::create_api_key).get(auth::list_api_keys),
        )
        .route("/auth/api-keys/{id}", delete(auth::delete_api_key))
        .route("/auth/status", get(auth::auth_status))
        .route(
            "/auth/invites",
            post(invites::create_invite).get(invites::list_invites),
        )
        .route("/auth/invites/{id}", delete(invites::revoke_invite))
        .route("/registry/token", get(registry::registry_token));

    protected = if state.config.dev_mode {
        protected.route_layer(from_fn_with_state(state.clone(), middleware::dev_auth))
    } else {
        protected.route_layer(from_fn_with_state(state.clone(), middleware::require_bearer))
    };

    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/accept-invite", post(invites::accept_invite))
        .merge(protected);

    Router::new()
        .route("/healthz", get(health::health))
        .nest("/api/v1", api)
        .layer(from_fn(middleware::request_id))
        .with_state(state)
}
