pub mod auth;
pub mod credentials;
pub mod nodes;
pub mod peers;

use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(auth::login))
        .route(
            "/api/admin/nodes",
            get(nodes::list_nodes).post(nodes::create_node),
        )
        .route(
            "/api/admin/nodes/{id}",
            get(nodes::get_node)
                .patch(nodes::update_node)
                .delete(nodes::delete_node),
        )
        .route("/api/admin/nodes/{id}/status", post(nodes::report_status))
        .route("/api/admin/nodes/{id}/history", get(nodes::status_history))
        .route(
            "/api/admin/credentials",
            get(credentials::list_credentials).post(credentials::create_credential),
        )
        .route(
            "/api/admin/credentials/{id}",
            axum::routing::patch(credentials::update_credential)
                .delete(credentials::delete_credential),
        )
        .route("/api/admin/access-log", get(credentials::list_access_log))
        .route("/api/peers", get(peers::discover_peers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
