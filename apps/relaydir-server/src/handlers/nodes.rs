use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::AdminUser;
use crate::error::ApiError;
use relaydir_db::models::node::{NewNode, NodeAdminView, NodeUpdate};
use relaydir_db::repositories::node_repo::{NodeFilter, StatusHistoryEntry};

#[derive(Deserialize)]
pub struct ListNodesQuery {
    /// Substring search over name/description, case-insensitive.
    pub q: Option<String>,
    pub protocol: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Serialize)]
pub struct NodeListResponse {
    pub nodes: Vec<NodeAdminView>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

pub async fn list_nodes(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListNodesQuery>,
) -> Result<Json<NodeListResponse>, ApiError> {
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(20);
    let filter = NodeFilter {
        search: query.q,
        protocol: query.protocol,
    };

    let (nodes, total) = state.nodes.list(filter, page, per_page).await?;
    Ok(Json(NodeListResponse {
        nodes: nodes.into_iter().map(NodeAdminView::from).collect(),
        total,
        page,
        per_page,
    }))
}

pub async fn create_node(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<NewNode>,
) -> Result<(StatusCode, Json<NodeAdminView>), ApiError> {
    let node = state.nodes.create(req).await?;
    Ok((StatusCode::CREATED, Json(node.into())))
}

pub async fn get_node(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<NodeAdminView>, ApiError> {
    let node = state
        .nodes
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Node {id} does not exist")))?;
    Ok(Json(node.into()))
}

pub async fn update_node(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<NodeUpdate>,
) -> Result<Json<NodeAdminView>, ApiError> {
    let node = state
        .nodes
        .update(id, req)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Node {id} does not exist")))?;
    Ok(Json(node.into()))
}

pub async fn delete_node(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.nodes.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Node {id} does not exist")))
    }
}

#[derive(Deserialize)]
pub struct StatusReport {
    pub status: String,
    pub response_time_ms: Option<i32>,
    pub metadata: Option<serde_json::Value>,
}

/// Health reports come from an external reporting actor; each call appends
/// one history row and refreshes the cached status.
pub async fn report_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(report): Json<StatusReport>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = state
        .nodes
        .record_status(id, &report.status, report.response_time_ms, report.metadata)
        .await?;
    if !updated {
        return Err(ApiError::NotFound(format!("Node {id} does not exist")));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

pub async fn status_history(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<StatusHistoryEntry>>, ApiError> {
    if state.nodes.get(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Node {id} does not exist")));
    }
    let history = state
        .nodes
        .status_history(id, query.limit.unwrap_or(50))
        .await?;
    Ok(Json(history))
}
