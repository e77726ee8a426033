use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::node::{NewNode, Node, NodeUpdate, STATUS_ONLINE};

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    /// Case-insensitive substring match over name and description.
    pub search: Option<String>,
    /// Exact protocol match.
    pub protocol: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NodeRepository {
    pool: PgPool,
}

impl NodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, node: &NewNode) -> Result<Node> {
        sqlx::query_as::<_, Node>(
            r#"
            INSERT INTO nodes (
                name, description, host, port, protocol, allow_relay,
                network_name, network_secret, max_connections,
                region, isp, contact_email, contact_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(&node.name)
        .bind(&node.description)
        .bind(&node.host)
        .bind(node.port)
        .bind(&node.protocol)
        .bind(node.allow_relay)
        .bind(&node.network_name)
        .bind(&node.network_secret)
        .bind(node.max_connections)
        .bind(&node.region)
        .bind(&node.isp)
        .bind(&node.contact_email)
        .bind(&node.contact_url)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert node")
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Node>> {
        sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch node by ID")
    }

    /// Merge a partial update into the row inside one transaction so the
    /// returned node reflects exactly what was written.
    pub async fn update(&self, id: i64, update: &NodeUpdate) -> Result<Option<Node>> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        let Some(mut node) =
            sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to fetch node for update")?
        else {
            return Ok(None);
        };

        update.apply_to(&mut node);

        let updated = sqlx::query_as::<_, Node>(
            r#"
            UPDATE nodes
            SET name = $1, description = $2, host = $3, port = $4, protocol = $5,
                allow_relay = $6, network_name = $7, network_secret = $8,
                max_connections = $9, region = $10, isp = $11,
                contact_email = $12, contact_url = $13,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $14
            RETURNING *
            "#,
        )
        .bind(&node.name)
        .bind(&node.description)
        .bind(&node.host)
        .bind(node.port)
        .bind(&node.protocol)
        .bind(node.allow_relay)
        .bind(&node.network_name)
        .bind(&node.network_secret)
        .bind(node.max_connections)
        .bind(&node.region)
        .bind(&node.isp)
        .bind(&node.contact_email)
        .bind(&node.contact_url)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to update node")?;

        tx.commit().await.context("Failed to commit node update")?;
        Ok(Some(updated))
    }

    /// History rows go with the node (ON DELETE CASCADE).
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM nodes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete node")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(
        &self,
        filter: &NodeFilter,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Node>, i64)> {
        let per_page = per_page.clamp(1, MAX_PAGE_SIZE);
        let page = page.max(1);
        let pattern = filter.search.as_ref().map(|s| format!("%{}%", s));

        let nodes = sqlx::query_as::<_, Node>(
            r#"
            SELECT * FROM nodes
            WHERE ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1)
              AND ($2::text IS NULL OR protocol = $2)
            ORDER BY id ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&pattern)
        .bind(&filter.protocol)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list nodes")?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM nodes
            WHERE ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1)
              AND ($2::text IS NULL OR protocol = $2)
            "#,
        )
        .bind(&pattern)
        .bind(&filter.protocol)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count nodes")?;

        Ok((nodes, total))
    }

    /// Candidate pool for the peer selector: cached status only, no
    /// reconstruction from the history table.
    pub async fn get_online_nodes(&self) -> Result<Vec<Node>> {
        sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE status = $1")
            .bind(STATUS_ONLINE)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch online nodes")
    }

    /// Append a history row and upsert the cached health fields in one
    /// transaction. Returns false when the node does not exist; the history
    /// table stays append-only either way.
    pub async fn record_status(
        &self,
        id: i64,
        status: &str,
        response_time_ms: Option<i32>,
        metadata: Option<serde_json::Value>,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        let result = sqlx::query(
            r#"
            UPDATE nodes
            SET status = $1, response_time_ms = $2,
                last_status_update = $3, updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            "#,
        )
        .bind(status)
        .bind(response_time_ms)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update cached node status")?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO node_status_history (node_id, status, response_time_ms, metadata)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(response_time_ms)
        .bind(&metadata)
        .execute(&mut *tx)
        .await
        .context("Failed to append status history")?;

        tx.commit().await.context("Failed to commit status update")?;
        tracing::debug!("Recorded status {} for node {}", status, id);
        Ok(true)
    }

    pub async fn get_status_history(
        &self,
        node_id: i64,
        limit: i64,
    ) -> Result<Vec<StatusHistoryEntry>> {
        sqlx::query_as::<_, StatusHistoryEntry>(
            r#"
            SELECT * FROM node_status_history
            WHERE node_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(node_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch status history")
    }
}

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub node_id: i64,
    pub status: String,
    pub response_time_ms: Option<i32>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
