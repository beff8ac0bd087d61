//! Registry token endpoint, speaking the Docker registry token
//! protocol.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Extension, Query, State};
use chrono::SecondsFormat;
use maxcloud_core::Ctx;
use maxcloud_registry::{RegistryError, issue_registry_token, parse_scope, validate_scope};
use serde::Serialize;
use tracing::{error, warn};

use super::ApiError;
use crate::middleware::RequestId;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RegistryTokenResponse {
    pub token: String,
    /// Same token under the OAuth2-compatible field name.
    pub access_token: String,
    pub expires_in: u64,
    pub issued_at: String,
}

pub async fn registry_token(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<RegistryTokenResponse>, ApiError> {
    let Some(org_id) = ctx.org_id() else {
        return Err(ApiError::unauthorized("unauthorized"));
    };

    let scope = params.get("scope").map(String::as_str).unwrap_or("");
    let service = params
        .get("service")
        .filter(|s| !s.is_empty())
        .map(String::as_str)
        .unwrap_or(&state.config.registry_url);

    let access = parse_scope(scope);
    if !validate_scope(&access, org_id) {
        warn!(%org_id, scope, "access denied, repository not owned by org");
        return Err(
            ApiError::forbidden("access denied to requested scope").with_request_id(&request_id)
        );
    }

    let issued = issue_registry_token(
        org_id,
        service,
        access,
        &state.config.registry_jwt_secret,
        state.config.registry_token_expiry,
    )
    .map_err(|err| match err {
        RegistryError::SecretNotConfigured => {
            error!("registry jwt secret not configured");
            ApiError::new(
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "registry not configured",
            )
            .with_request_id(&request_id)
        }
        RegistryError::Encoding(msg) => {
            error!(error = %msg, "failed to sign registry token");
            ApiError::internal(&request_id)
        }
    })?;

    Ok(Json(RegistryTokenResponse {
        access_token: issued.token.clone(),
        token: issued.token,
        expires_in: issued.expires_in,
        issued_at: issued
            .issued_at
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}
