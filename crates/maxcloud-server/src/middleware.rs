//! Request middleware: bearer authentication, the dev-mode tenant, and
//! per-request ids.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use maxcloud_core::Ctx;
use maxcloud_core::store::AuthStore;
use tracing::{Instrument, warn};
use uuid::Uuid;

use crate::handlers::ApiError;
use crate::state::AppState;

/// Budget for the detached last-used timestamp update.
const LAST_USED_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-request id, installed as a request extension and echoed in the
/// `x-request-id` response header.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Wrap every request in a tracing span carrying a fresh request id.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(RequestId(id.clone()));

    let span = tracing::info_span!(
        "http.request",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path(),
    );
    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Enforce `Authorization: Bearer mc_…` and install the tenant context.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let raw = match bearer_key(&req) {
        Ok(raw) => raw,
        Err(err) => return err.into_response(),
    };

    let info = match state.auth.validate_api_key(&Ctx::privileged(), &raw).await {
        Ok(info) => info,
        Err(_) => return ApiError::unauthorized("invalid api key").into_response(),
    };

    // Advisory timestamp update, detached from the request. The task
    // has its own budget and its failure never reaches the response;
    // a panic is contained by the runtime.
    spawn_last_used_update(state.auth.clone(), info.id);

    req.extensions_mut()
        .insert(Ctx::tenant(info.org_id, info.user_id));
    next.run(req).await
}

/// Dev-mode authentication: honor a valid bearer key when present,
/// otherwise fall back to the fixed dev tenant.
pub async fn dev_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if let Ok(raw) = bearer_key(&req)
        && let Ok(info) = state.auth.validate_api_key(&Ctx::privileged(), &raw).await
    {
        req.extensions_mut()
            .insert(Ctx::tenant(info.org_id, info.user_id));
        return next.run(req).await;
    }

    let org_id = state.config.dev_org_uid.unwrap_or(Uuid::nil());
    req.extensions_mut()
        .insert(Ctx::tenant(org_id, Uuid::nil()));
    next.run(req).await
}

fn bearer_key(req: &Request) -> Result<String, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;
    let value = header
        .to_str()
        .map_err(|_| ApiError::unauthorized("invalid authorization format"))?;
    let raw = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("invalid authorization format"))?;
    if !raw.starts_with("mc_") {
        return Err(ApiError::unauthorized("invalid api key format"));
    }
    Ok(raw.to_string())
}

fn spawn_last_used_update(auth: Arc<dyn AuthStore>, key_id: Uuid) {
    tokio::spawn(async move {
        let ctx = Ctx::privileged();
        let update = auth.update_api_key_last_used(&ctx, key_id);
        match tokio::time::timeout(LAST_USED_TIMEOUT, update).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(%key_id, error = %err, "failed to update api key last_used_at");
            }
            Err(_) => {
                warn!(%key_id, "api key last_used_at update timed out");
            }
        }
    });
}
