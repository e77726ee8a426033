use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::credential::{ApiCredential, CredentialUpdate};

#[derive(Debug, Clone)]
pub struct CredentialRepository {
    pool: PgPool,
}

impl CredentialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns None when the key already exists, so the caller can retry
    /// with fresh key material instead of unpacking a unique-violation error.
    pub async fn create(
        &self,
        key: &str,
        rate_limit: i32,
        description: Option<&str>,
    ) -> Result<Option<ApiCredential>> {
        sqlx::query_as::<_, ApiCredential>(
            r#"
            INSERT INTO api_credentials (key, rate_limit, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(key)
        .bind(rate_limit)
        .bind(description)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to insert API credential")
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ApiCredential>> {
        sqlx::query_as::<_, ApiCredential>("SELECT * FROM api_credentials WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch credential by ID")
    }

    pub async fn get_by_key(&self, key: &str) -> Result<Option<ApiCredential>> {
        sqlx::query_as::<_, ApiCredential>("SELECT * FROM api_credentials WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch credential by key")
    }

    pub async fn get_all(&self) -> Result<Vec<ApiCredential>> {
        sqlx::query_as::<_, ApiCredential>(
            "SELECT * FROM api_credentials ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch API credentials")
    }

    pub async fn update(&self, id: i64, update: &CredentialUpdate) -> Result<Option<ApiCredential>> {
        sqlx::query_as::<_, ApiCredential>(
            r#"
            UPDATE api_credentials
            SET rate_limit = COALESCE($1, rate_limit),
                description = COALESCE($2, description),
                is_active = COALESCE($3, is_active),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(update.rate_limit)
        .bind(&update.description)
        .bind(update.is_active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update API credential")
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM api_credentials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete API credential")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn touch_last_used(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE api_credentials SET last_used_at = CURRENT_TIMESTAMP WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to touch credential last_used_at")?;
        Ok(())
    }
}
