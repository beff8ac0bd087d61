//! Service declaration handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use maxcloud_core::models::service::{DeployRequest, Service, ServiceStatus};
use maxcloud_core::{Ctx, Error};
use tracing::info;
use uuid::Uuid;

use super::{ApiError, store_error};
use crate::middleware::RequestId;
use crate::state::AppState;

pub async fn create_service(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Json<DeployRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Service>), ApiError> {
    let Json(req) = body.map_err(|_| ApiError::bad_request("invalid JSON"))?;

    if req.name.is_empty() || req.image.is_empty() {
        return Err(ApiError::bad_request("name and image are required"));
    }

    let svc = state
        .services
        .create(&ctx, req)
        .await
        .map_err(|e| store_error(e, &request_id))?;

    Ok((StatusCode::CREATED, Json(svc)))
}

pub async fn list_services(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Extension(request_id): Extension<RequestId>,
) -> Result<Json<Vec<Service>>, ApiError> {
    let services = state
        .services
        .list(&ctx)
        .await
        .map_err(|e| store_error(e, &request_id))?;
    Ok(Json(services))
}

pub async fn get_service(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<Service>, ApiError> {
    let svc = resolve_service(&state, &ctx, &id, &request_id).await?;
    Ok(Json(svc))
}

/// Mark a service for deletion. The reconciler removes the substrate
/// resource and the store row on a later tick; a service already in
/// `deleting` reads as gone.
pub async fn delete_service(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let svc = resolve_service(&state, &ctx, &id, &request_id).await?;

    if svc.status == ServiceStatus::Deleting {
        return Err(ApiError::not_found("service not found"));
    }

    state
        .services
        .update_status(&ctx, svc.id, ServiceStatus::Deleting, "")
        .await
        .map_err(|e| store_error(e, &request_id))?;

    info!(id = %svc.id, "service marked for deletion");
    Ok(StatusCode::NO_CONTENT)
}

/// Look a service up by id, falling back to a name lookup when the
/// path segment is not a UUID (or names no service of this tenant).
pub(crate) async fn resolve_service(
    state: &AppState,
    ctx: &Ctx,
    id_or_name: &str,
    request_id: &RequestId,
) -> Result<Service, ApiError> {
    if let Ok(id) = Uuid::parse_str(id_or_name) {
        match state.services.get(ctx, id).await {
            Ok(svc) => return Ok(svc),
            Err(Error::NotFound) => {}
            Err(e) => return Err(store_error(e, request_id)),
        }
    }

    match state.services.get_by_name(ctx, id_or_name).await {
        Ok(svc) => Ok(svc),
        Err(Error::NotFound) => Err(ApiError::not_found("service not found")),
        Err(e) => Err(store_error(e, request_id)),
    }
}
