use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Append-only audit row. The rate limiter derives its window count from
/// this table; rows are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccessLogEntry {
    pub id: i64,
    pub credential_id: Option<i64>,
    pub endpoint: String,
    pub method: String,
    pub ip: String,
    pub user_agent: Option<String>,
    pub status_code: i32,
    pub response_time_ms: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAccessLogEntry {
    pub credential_id: Option<i64>,
    pub endpoint: String,
    pub method: String,
    pub ip: String,
    pub user_agent: Option<String>,
    pub status_code: i32,
    pub response_time_ms: Option<i32>,
}
