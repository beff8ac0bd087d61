//! Registration, API key, and identity handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use maxcloud_core::Ctx;
use maxcloud_core::models::api_key::ApiKeyInfo;
use maxcloud_core::models::membership::AuthInfo;
use maxcloud_core::models::organization::Organization;
use maxcloud_core::models::user::User;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{ApiError, store_error};
use crate::middleware::RequestId;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub org_name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub organization: Organization,
    /// The raw API key, visible only in this response.
    pub api_key: String,
}

/// Create a new account: user + organization + admin membership +
/// initial API key, atomically.
pub async fn register(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(req) = body.map_err(|_| ApiError::bad_request("invalid JSON"))?;

    if req.email.is_empty() || req.org_name.is_empty() {
        return Err(ApiError::bad_request("email and org_name are required"));
    }

    let registration = state
        .auth
        .register(&Ctx::privileged(), &req.email, &req.org_name)
        .await
        .map_err(|e| store_error(e, &request_id))?;

    info!(
        email = %req.email,
        org = %req.org_name,
        org_id = %registration.organization.id,
        "user registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: registration.user,
            organization: registration.organization,
            api_key: registration.raw_api_key,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateApiKeyResponse {
    /// The raw API key, visible only in this response.
    pub api_key: String,
    pub info: ApiKeyInfo,
}

pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Json<CreateApiKeyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateApiKeyResponse>), ApiError> {
    let Json(req) = body.map_err(|_| ApiError::bad_request("invalid JSON"))?;

    if req.name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }

    let (org_id, user_id) = tenant_of(&ctx)?;
    let (raw, info) = state
        .auth
        .create_api_key(&ctx, org_id, user_id, &req.name)
        .await
        .map_err(|e| store_error(e, &request_id))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse { api_key: raw, info }),
    ))
}

pub async fn list_api_keys(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Extension(request_id): Extension<RequestId>,
) -> Result<Json<Vec<ApiKeyInfo>>, ApiError> {
    let (org_id, _) = tenant_of(&ctx)?;
    let keys = state
        .auth
        .list_api_keys(&ctx, org_id)
        .await
        .map_err(|e| store_error(e, &request_id))?;
    Ok(Json(keys))
}

pub async fn delete_api_key(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let key_id =
        Uuid::parse_str(&id).map_err(|_| ApiError::not_found("api key not found"))?;

    let (org_id, _) = tenant_of(&ctx)?;
    state
        .auth
        .delete_api_key(&ctx, org_id, key_id)
        .await
        .map_err(|e| store_error(e, &request_id))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn auth_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Extension(request_id): Extension<RequestId>,
) -> Result<Json<AuthInfo>, ApiError> {
    let (org_id, user_id) = tenant_of(&ctx)?;
    let info = state
        .auth
        .get_auth_info(&ctx, org_id, user_id)
        .await
        .map_err(|e| store_error(e, &request_id))?;
    Ok(Json(info))
}

/// Both tenant ids; the auth middleware guarantees they are present on
/// protected routes.
pub(crate) fn tenant_of(ctx: &Ctx) -> Result<(Uuid, Uuid), ApiError> {
    match (ctx.org_id(), ctx.user_id()) {
        (Some(org_id), Some(user_id)) => Ok((org_id, user_id)),
        _ => Err(ApiError::unauthorized("unauthorized")),
    }
}
