use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// Distinguishes an absent JSON field (outer None) from an explicit null
/// (Some(None)) when deserializing partial updates.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

pub const STATUS_ONLINE: &str = "Online";
pub const STATUS_OFFLINE: &str = "Offline";

pub const ALLOWED_PROTOCOLS: &[&str] = &["http", "https", "ws", "wss"];

/// Canonical node row. `status` and `response_time_ms` are only ever written
/// through `NodeRepository::record_status`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Node {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub host: String,
    pub port: i32,
    pub protocol: String,
    pub allow_relay: bool,
    pub network_name: Option<String>,
    pub network_secret: Option<String>,
    pub max_connections: i32,
    pub region: Option<String>,
    pub isp: Option<String>,
    pub contact_email: Option<String>,
    pub contact_url: Option<String>,
    pub status: String,
    pub response_time_ms: Option<i32>,
    pub last_status_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    pub fn is_online(&self) -> bool {
        self.status == STATUS_ONLINE
    }
}

/// Insert payload. Health fields are absent on purpose: new nodes start
/// Offline with no measured response time.
#[derive(Debug, Clone, Deserialize)]
pub struct NewNode {
    pub name: String,
    pub description: Option<String>,
    pub host: String,
    pub port: i32,
    pub protocol: String,
    #[serde(default)]
    pub allow_relay: bool,
    pub network_name: Option<String>,
    pub network_secret: Option<String>,
    pub max_connections: i32,
    pub region: Option<String>,
    pub isp: Option<String>,
    pub contact_email: Option<String>,
    pub contact_url: Option<String>,
}

/// Partial update. `None` leaves a field alone; for nullable columns the
/// inner Option distinguishes "set to null" from "leave unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub host: Option<String>,
    pub port: Option<i32>,
    pub protocol: Option<String>,
    pub allow_relay: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub network_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub network_secret: Option<Option<String>>,
    pub max_connections: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub region: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub isp: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_url: Option<Option<String>>,
}

impl NodeUpdate {
    /// Merge this update into an existing row.
    pub fn apply_to(&self, node: &mut Node) {
        if let Some(v) = &self.name {
            node.name = v.clone();
        }
        if let Some(v) = &self.description {
            node.description = v.clone();
        }
        if let Some(v) = &self.host {
            node.host = v.clone();
        }
        if let Some(v) = self.port {
            node.port = v;
        }
        if let Some(v) = &self.protocol {
            node.protocol = v.clone();
        }
        if let Some(v) = self.allow_relay {
            node.allow_relay = v;
        }
        if let Some(v) = &self.network_name {
            node.network_name = v.clone();
        }
        if let Some(v) = &self.network_secret {
            node.network_secret = v.clone();
        }
        if let Some(v) = self.max_connections {
            node.max_connections = v;
        }
        if let Some(v) = &self.region {
            node.region = v.clone();
        }
        if let Some(v) = &self.isp {
            node.isp = v.clone();
        }
        if let Some(v) = &self.contact_email {
            node.contact_email = v.clone();
        }
        if let Some(v) = &self.contact_url {
            node.contact_url = v.clone();
        }
    }
}

/// Full projection for authenticated admins.
#[derive(Debug, Clone, Serialize)]
pub struct NodeAdminView {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub host: String,
    pub port: i32,
    pub protocol: String,
    pub allow_relay: bool,
    pub network_name: Option<String>,
    pub network_secret: Option<String>,
    pub max_connections: i32,
    pub region: Option<String>,
    pub isp: Option<String>,
    pub contact_email: Option<String>,
    pub contact_url: Option<String>,
    pub status: String,
    pub response_time_ms: Option<i32>,
    pub last_status_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Projection served on the public peers endpoint. No secrets, no contact
/// data, no free-form description.
#[derive(Debug, Clone, Serialize)]
pub struct NodePublicView {
    pub id: i64,
    pub name: String,
    pub host: String,
    pub port: i32,
    pub protocol: String,
    pub allow_relay: bool,
    pub network_name: Option<String>,
    pub max_connections: i32,
    pub region: Option<String>,
    pub response_time_ms: Option<i32>,
}

impl From<Node> for NodeAdminView {
    fn from(n: Node) -> Self {
        Self {
            id: n.id,
            name: n.name,
            description: n.description,
            host: n.host,
            port: n.port,
            protocol: n.protocol,
            allow_relay: n.allow_relay,
            network_name: n.network_name,
            network_secret: n.network_secret,
            max_connections: n.max_connections,
            region: n.region,
            isp: n.isp,
            contact_email: n.contact_email,
            contact_url: n.contact_url,
            status: n.status,
            response_time_ms: n.response_time_ms,
            last_status_update: n.last_status_update,
            created_at: n.created_at,
            updated_at: n.updated_at,
        }
    }
}

impl From<Node> for NodePublicView {
    fn from(n: Node) -> Self {
        Self {
            id: n.id,
            name: n.name,
            host: n.host,
            port: n.port,
            protocol: n.protocol,
            allow_relay: n.allow_relay,
            network_name: n.network_name,
            max_connections: n.max_connections,
            region: n.region,
            response_time_ms: n.response_time_ms,
        }
    }
}
