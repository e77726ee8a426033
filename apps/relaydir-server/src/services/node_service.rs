use tracing::info;

use crate::error::ApiError;
use crate::services::geo_service::GeoService;
use relaydir_db::models::node::{
    ALLOWED_PROTOCOLS, NewNode, Node, NodeUpdate, STATUS_OFFLINE, STATUS_ONLINE,
};
use relaydir_db::repositories::node_repo::{NodeFilter, NodeRepository, StatusHistoryEntry};

#[derive(Clone)]
pub struct NodeService {
    nodes: NodeRepository,
    geo: GeoService,
}

impl NodeService {
    pub fn new(nodes: NodeRepository, geo: GeoService) -> Self {
        Self { nodes, geo }
    }

    /// Validation happens before any side effect; geo enrichment happens
    /// after it and is allowed to fail silently.
    pub async fn create(&self, mut node: NewNode) -> Result<Node, ApiError> {
        validate_new(&node)?;

        if node.region.is_none() || node.isp.is_none() {
            if let Some(geo) = self.geo.lookup(&node.host).await {
                if node.region.is_none() {
                    node.region = Some(geo.region);
                }
                if node.isp.is_none() {
                    node.isp = geo.isp;
                }
            }
        }

        let created = self.nodes.create(&node).await?;
        info!("Registered node {} ({})", created.id, created.name);
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Node>, ApiError> {
        Ok(self.nodes.get_by_id(id).await?)
    }

    pub async fn update(&self, id: i64, update: NodeUpdate) -> Result<Option<Node>, ApiError> {
        validate_update(&update)?;
        Ok(self.nodes.update(id, &update).await?)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, ApiError> {
        let deleted = self.nodes.delete(id).await?;
        if deleted {
            info!("Deleted node {}", id);
        }
        Ok(deleted)
    }

    pub async fn list(
        &self,
        filter: NodeFilter,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Node>, i64), ApiError> {
        Ok(self.nodes.list(&filter, page, per_page).await?)
    }

    /// Status is reported by an external health-reporting actor, never
    /// measured here. Returns false for an unknown node.
    pub async fn record_status(
        &self,
        id: i64,
        status: &str,
        response_time_ms: Option<i32>,
        metadata: Option<serde_json::Value>,
    ) -> Result<bool, ApiError> {
        if status != STATUS_ONLINE && status != STATUS_OFFLINE {
            return Err(ApiError::Validation(format!(
                "status must be '{STATUS_ONLINE}' or '{STATUS_OFFLINE}'"
            )));
        }
        if let Some(rt) = response_time_ms {
            if rt < 0 {
                return Err(ApiError::Validation(
                    "response_time_ms must be non-negative".into(),
                ));
            }
        }
        Ok(self
            .nodes
            .record_status(id, status, response_time_ms, metadata)
            .await?)
    }

    pub async fn status_history(
        &self,
        node_id: i64,
        limit: i64,
    ) -> Result<Vec<StatusHistoryEntry>, ApiError> {
        Ok(self.nodes.get_status_history(node_id, limit.clamp(1, 100)).await?)
    }
}

fn validate_new(node: &NewNode) -> Result<(), ApiError> {
    if node.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be blank".into()));
    }
    if node.host.trim().is_empty() {
        return Err(ApiError::Validation("host must not be blank".into()));
    }
    validate_port(node.port)?;
    validate_protocol(&node.protocol)?;
    validate_max_connections(node.max_connections)?;
    Ok(())
}

fn validate_update(update: &NodeUpdate) -> Result<(), ApiError> {
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("name must not be blank".into()));
        }
    }
    if let Some(host) = &update.host {
        if host.trim().is_empty() {
            return Err(ApiError::Validation("host must not be blank".into()));
        }
    }
    if let Some(port) = update.port {
        validate_port(port)?;
    }
    if let Some(protocol) = &update.protocol {
        validate_protocol(protocol)?;
    }
    if let Some(max_connections) = update.max_connections {
        validate_max_connections(max_connections)?;
    }
    Ok(())
}

fn validate_port(port: i32) -> Result<(), ApiError> {
    if !(1..=65535).contains(&port) {
        return Err(ApiError::Validation("port must be between 1 and 65535".into()));
    }
    Ok(())
}

fn validate_protocol(protocol: &str) -> Result<(), ApiError> {
    if !ALLOWED_PROTOCOLS.contains(&protocol) {
        return Err(ApiError::Validation(format!(
            "protocol must be one of: {}",
            ALLOWED_PROTOCOLS.join(", ")
        )));
    }
    Ok(())
}

fn validate_max_connections(max_connections: i32) -> Result<(), ApiError> {
    if max_connections <= 0 {
        return Err(ApiError::Validation("max_connections must be positive".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_node() -> NewNode {
        NewNode {
            name: "edge-1".to_string(),
            description: None,
            host: "relay.example.net".to_string(),
            port: 443,
            protocol: "wss".to_string(),
            allow_relay: true,
            network_name: None,
            network_secret: None,
            max_connections: 500,
            region: None,
            isp: None,
            contact_email: None,
            contact_url: None,
        }
    }

    #[test]
    fn accepts_a_valid_node() {
        assert!(validate_new(&valid_node()).is_ok());
    }

    #[test]
    fn rejects_blank_name() {
        let mut n = valid_node();
        n.name = "   ".to_string();
        assert!(matches!(validate_new(&n), Err(ApiError::Validation(_))));
    }

    #[test]
    fn rejects_out_of_range_port() {
        let mut n = valid_node();
        n.port = 0;
        assert!(validate_new(&n).is_err());
        n.port = 65536;
        assert!(validate_new(&n).is_err());
        n.port = 65535;
        assert!(validate_new(&n).is_ok());
    }

    #[test]
    fn rejects_unknown_protocol() {
        let mut n = valid_node();
        n.protocol = "ftp".to_string();
        assert!(validate_new(&n).is_err());
    }

    #[test]
    fn rejects_non_positive_max_connections() {
        let mut n = valid_node();
        n.max_connections = 0;
        assert!(validate_new(&n).is_err());
        n.max_connections = -5;
        assert!(validate_new(&n).is_err());
    }

    #[test]
    fn partial_update_only_validates_supplied_fields() {
        let update = NodeUpdate {
            description: Some(Some("edge relay".to_string())),
            ..Default::default()
        };
        assert!(validate_update(&update).is_ok());

        let update = NodeUpdate {
            port: Some(70000),
            ..Default::default()
        };
        assert!(validate_update(&update).is_err());
    }
}
