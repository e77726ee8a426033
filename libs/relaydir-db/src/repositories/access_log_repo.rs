use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::access_log::{AccessLogEntry, NewAccessLogEntry};

#[derive(Debug, Clone)]
pub struct AccessLogRepository {
    pool: PgPool,
}

impl AccessLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, entry: &NewAccessLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO access_log
                (credential_id, endpoint, method, ip, user_agent, status_code, response_time_ms)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.credential_id)
        .bind(&entry.endpoint)
        .bind(&entry.method)
        .bind(&entry.ip)
        .bind(&entry.user_agent)
        .bind(entry.status_code)
        .bind(entry.response_time_ms)
        .execute(&self.pool)
        .await
        .context("Failed to insert access log entry")?;
        Ok(())
    }

    pub async fn get_recent(&self, limit: i64) -> Result<Vec<AccessLogEntry>> {
        sqlx::query_as::<_, AccessLogEntry>(
            "SELECT * FROM access_log ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent access log entries")
    }

    /// Window count for the rate limiter. The lower bound is inclusive: a
    /// row stamped exactly at the cutoff still counts.
    pub async fn count_since(&self, credential_id: i64, cutoff: DateTime<Utc>) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM access_log WHERE credential_id = $1 AND created_at >= $2",
        )
        .bind(credential_id)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count recent access log entries")
    }
}
