use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApiCredential {
    pub id: i64,
    pub key: String,
    pub is_active: bool,
    /// Requests allowed per rolling minute. Always > 0.
    pub rate_limit: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialUpdate {
    pub rate_limit: Option<i32>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}
