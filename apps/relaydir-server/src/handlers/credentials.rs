use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::AppState;
use crate::auth::AdminUser;
use crate::error::ApiError;
use relaydir_db::models::access_log::AccessLogEntry;
use relaydir_db::models::credential::{ApiCredential, CredentialUpdate};

#[derive(Deserialize)]
pub struct CreateCredentialRequest {
    pub rate_limit: i32,
    pub description: Option<String>,
}

pub async fn list_credentials(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<ApiCredential>>, ApiError> {
    Ok(Json(state.credentials.get_all().await?))
}

pub async fn create_credential(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<CreateCredentialRequest>,
) -> Result<(StatusCode, Json<ApiCredential>), ApiError> {
    let credential = state
        .credentials
        .create(req.rate_limit, req.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(credential)))
}

pub async fn update_credential(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<CredentialUpdate>,
) -> Result<Json<ApiCredential>, ApiError> {
    let credential = state
        .credentials
        .update(id, req)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Credential {id} does not exist")))?;
    Ok(Json(credential))
}

pub async fn delete_credential(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.credentials.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Credential {id} does not exist")))
    }
}

#[derive(Deserialize)]
pub struct AccessLogQuery {
    pub limit: Option<i64>,
}

/// Recent public-route traffic, newest first.
pub async fn list_access_log(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AccessLogQuery>,
) -> Result<Json<Vec<AccessLogEntry>>, ApiError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    Ok(Json(state.access_log.get_recent(limit).await?))
}
