//! Invitation handlers. Create/list/revoke are admin-gated; accept is
//! public (the token is the credential).

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use maxcloud_core::Ctx;
use maxcloud_core::models::invitation::Invitation;
use maxcloud_core::models::membership::OrgRole;
use maxcloud_core::models::organization::Organization;
use maxcloud_core::models::user::User;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use super::auth::tenant_of;
use super::{ApiError, store_error};
use crate::middleware::RequestId;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    #[serde(default)]
    pub email: String,
    pub role: Option<OrgRole>,
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub invitation: Invitation,
    /// Raw token, emitted in dev mode only; production delivers it by
    /// email exclusively.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

pub async fn create_invite(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Json<InviteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InviteResponse>), ApiError> {
    let (org_id, user_id) = tenant_of(&ctx)?;
    let info = require_admin(&state, &ctx, org_id, user_id, &request_id).await?;

    let Json(req) = body.map_err(|_| ApiError::bad_request("invalid JSON"))?;

    if req.email.is_empty() {
        return Err(ApiError::bad_request("email is required"));
    }
    let role = req.role.unwrap_or(OrgRole::Member);

    let expires_at = Utc::now()
        + Duration::from_std(state.config.invite_expiration)
            .unwrap_or_else(|_| Duration::hours(168));

    let (invitation, raw_token) = state
        .auth
        .create_invite(&ctx, org_id, &req.email, role, user_id, expires_at)
        .await
        .map_err(|e| store_error(e, &request_id))?;

    if let Err(err) = state
        .email
        .send_invite(&req.email, &info.organization.name, &raw_token)
        .await
    {
        error!(error = %err, email = %req.email, "failed to send invite email");
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to send invite email",
        )
        .with_request_id(&request_id));
    }

    info!(email = %req.email, org = %org_id, "invite created and email sent");

    let token = state.config.dev_mode.then_some(raw_token);
    Ok((
        StatusCode::CREATED,
        Json(InviteResponse { invitation, token }),
    ))
}

pub async fn list_invites(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Extension(request_id): Extension<RequestId>,
) -> Result<Json<Vec<Invitation>>, ApiError> {
    let (org_id, user_id) = tenant_of(&ctx)?;
    require_admin(&state, &ctx, org_id, user_id, &request_id).await?;

    let invites = state
        .auth
        .list_invites(&ctx, org_id)
        .await
        .map_err(|e| store_error(e, &request_id))?;
    Ok(Json(invites))
}

pub async fn revoke_invite(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let (org_id, user_id) = tenant_of(&ctx)?;
    require_admin(&state, &ctx, org_id, user_id, &request_id).await?;

    let invite_id =
        Uuid::parse_str(&id).map_err(|_| ApiError::not_found("invite not found"))?;

    state
        .auth
        .revoke_invite(&ctx, org_id, invite_id)
        .await
        .map_err(|e| store_error(e, &request_id))?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AcceptInviteResponse {
    pub user: User,
    pub organization: Organization,
    pub role: OrgRole,
    /// The raw API key, visible only in this response.
    pub api_key: String,
}

/// Accept an invitation. Public; the token itself authenticates.
pub async fn accept_invite(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Json<AcceptInviteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AcceptInviteResponse>), ApiError> {
    let Json(req) = body.map_err(|_| ApiError::bad_request("invalid JSON"))?;

    if req.token.is_empty() {
        return Err(ApiError::bad_request("token is required"));
    }

    let accepted = state
        .auth
        .accept_invite(&Ctx::privileged(), &req.token)
        .await
        .map_err(|e| store_error(e, &request_id))?;

    info!(
        email = %accepted.user.email,
        org = %accepted.organization.id,
        "invite accepted"
    );

    Ok((
        StatusCode::CREATED,
        Json(AcceptInviteResponse {
            user: accepted.user,
            organization: accepted.organization,
            role: accepted.role,
            api_key: accepted.raw_api_key,
        }),
    ))
}

/// Fetch the caller's auth info and reject non-admins.
async fn require_admin(
    state: &AppState,
    ctx: &Ctx,
    org_id: Uuid,
    user_id: Uuid,
    request_id: &RequestId,
) -> Result<maxcloud_core::models::membership::AuthInfo, ApiError> {
    let info = state
        .auth
        .get_auth_info(ctx, org_id, user_id)
        .await
        .map_err(|e| store_error(e, request_id))?;

    if info.role != OrgRole::Admin {
        return Err(ApiError::forbidden("admin role required"));
    }
    Ok(info)
}
