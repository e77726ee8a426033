use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::AppState;
use crate::auth::ApiCaller;
use crate::error::ApiError;
use crate::services::rate_limiter::RateDecision;
use relaydir_db::models::access_log::NewAccessLogEntry;
use relaydir_db::models::node::NodePublicView;

const DEFAULT_PEER_COUNT: usize = 5;
const PEERS_ENDPOINT: &str = "/api/peers";

#[derive(Deserialize)]
pub struct PeersQuery {
    pub count: Option<usize>,
    pub protocol: Option<String>,
    pub region: Option<String>,
}

#[derive(Serialize)]
pub struct PeersResponse {
    pub peers: Vec<NodePublicView>,
    pub total_available: usize,
    pub has_more: bool,
}

/// Public discovery endpoint. API-key auth has already run in the
/// extractor; this handler owns the rate-limit check (it needs the decision
/// for the response headers) and fires the access-log write after the
/// outcome is known.
pub async fn discover_peers(
    State(state): State<AppState>,
    caller: ApiCaller,
    headers: HeaderMap,
    Query(query): Query<PeersQuery>,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let credential = caller.0;

    let decision = state.rate_limiter.check(credential.id).await?;

    if !decision.allowed {
        let response = (
            StatusCode::TOO_MANY_REQUESTS,
            rate_limit_headers(&decision),
            Json(serde_json::json!({ "error": "Rate limit exceeded" })),
        )
            .into_response();
        log_request(&state, credential.id, &headers, &response, started);
        return Ok(response);
    }

    let count = query.count.unwrap_or(DEFAULT_PEER_COUNT);
    let result = state
        .peer_selector
        .select_peers(count, query.protocol.as_deref(), query.region.as_deref())
        .await;

    let response = match result {
        Ok(selection) => (
            StatusCode::OK,
            rate_limit_headers(&decision),
            Json(PeersResponse {
                total_available: selection.total_available,
                has_more: selection.has_more,
                peers: selection
                    .peers
                    .into_iter()
                    .map(NodePublicView::from)
                    .collect(),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    };

    log_request(&state, credential.id, &headers, &response, started);
    Ok(response)
}

fn rate_limit_headers(decision: &RateDecision) -> [(&'static str, String); 3] {
    [
        ("x-ratelimit-limit", decision.limit.to_string()),
        ("x-ratelimit-remaining", decision.remaining.to_string()),
        ("x-ratelimit-reset", decision.reset_at.timestamp().to_string()),
    ]
}

fn log_request(
    state: &AppState,
    credential_id: i64,
    headers: &HeaderMap,
    response: &Response,
    started: Instant,
) {
    state.access_logger.log(NewAccessLogEntry {
        credential_id: Some(credential_id),
        endpoint: PEERS_ENDPOINT.to_string(),
        method: "GET".to_string(),
        ip: extract_ip(headers),
        user_agent: headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()),
        status_code: response.status().as_u16() as i32,
        response_time_ms: Some(started.elapsed().as_millis() as i32),
    });
}

/// Client IP, honoring X-Forwarded-For when a proxy sits in front.
fn extract_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_for_takes_the_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(extract_ip(&headers), "203.0.113.9");
    }

    #[test]
    fn missing_forwarded_for_is_unknown() {
        assert_eq!(extract_ip(&HeaderMap::new()), "unknown");
    }
}
