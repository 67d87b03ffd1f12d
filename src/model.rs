//! Load-balancer resources as the driver sees them
//!
//! Only the fields that are sent to the Control Center or that affect status
//! handling are modelled here.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Statistics mapping returned by the Control Center for a pool
pub type PoolStats = Map<String, Value>;

/// Kinds of resource managed through the Control Center
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Vip,
    Pool,
    Member,
    HealthMonitor,
}

impl ResourceKind {
    /// Collection segment used in remote resource paths
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Vip => "vips",
            ResourceKind::Pool => "pools",
            ResourceKind::Member => "members",
            ResourceKind::HealthMonitor => "healthmonitors",
        }
    }

    /// Key wrapping the resource object in request bodies, e.g. `{"vip": {..}}`
    pub fn resource_key(&self) -> &'static str {
        match self {
            ResourceKind::Vip => "vip",
            ResourceKind::Pool => "pool",
            ResourceKind::Member => "member",
            ResourceKind::HealthMonitor => "healthmonitor",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_key())
    }
}

/// Resource status.
///
/// `PENDING_CREATE`, `ACTIVE` and `ERROR` are set locally. Anything else is a
/// status string reported by the Control Center and is stored verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    PendingCreate,
    Active,
    Error,
    Remote(String),
}

pub const PENDING_CREATE: &str = "PENDING_CREATE";
pub const ACTIVE: &str = "ACTIVE";
pub const ERROR: &str = "ERROR";

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::PendingCreate => PENDING_CREATE,
            Status::Active => ACTIVE,
            Status::Error => ERROR,
            Status::Remote(s) => s,
        }
    }

    pub fn is_pending_create(&self) -> bool {
        matches!(self, Status::PendingCreate)
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        match s {
            PENDING_CREATE => Status::PendingCreate,
            ACTIVE => Status::Active,
            ERROR => Status::Error,
            other => Status::Remote(other.to_string()),
        }
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        match s.as_str() {
            PENDING_CREATE | ACTIVE | ERROR => Status::from(s.as_str()),
            _ => Status::Remote(s),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Remote(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

fn default_connection_limit() -> i64 {
    -1
}

fn default_weight() -> u32 {
    1
}

fn default_http_method() -> String {
    "GET".to_string()
}

fn default_url_path() -> String {
    "/".to_string()
}

fn default_expected_codes() -> String {
    "200".to_string()
}

/// Virtual IP exposed to clients
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vip {
    pub id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub subnet_id: String,
    pub address: String,
    #[serde(default)]
    pub port_id: Option<String>,
    pub protocol: String,
    pub protocol_port: u16,
    #[serde(default)]
    pub pool_id: Option<String>,
    /// -1 means unlimited
    #[serde(default = "default_connection_limit")]
    pub connection_limit: i64,
    #[serde(default = "default_true")]
    pub admin_state_up: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_persistence: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub subnet_id: String,
    #[serde(default)]
    pub vip_id: Option<String>,
    pub protocol: String,
    pub lb_method: String,
    #[serde(default = "default_true")]
    pub admin_state_up: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub tenant_id: String,
    pub pool_id: String,
    pub address: String,
    pub protocol_port: u16,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default = "default_true")]
    pub admin_state_up: bool,
}

/// Health check performed against pool members
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MonitorType {
    Ping,
    Tcp,
    Http,
    Https,
}

impl MonitorType {
    /// HTTP-family monitors carry method, URL path and expected codes
    pub fn is_http(&self) -> bool {
        matches!(self, MonitorType::Http | MonitorType::Https)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthMonitor {
    pub id: String,
    pub tenant_id: String,
    #[serde(rename = "type")]
    pub monitor_type: MonitorType,
    pub delay: u32,
    pub timeout: u32,
    pub max_retries: u32,
    #[serde(default = "default_true")]
    pub admin_state_up: bool,
    #[serde(default = "default_http_method")]
    pub http_method: String,
    #[serde(default = "default_url_path")]
    pub url_path: String,
    #[serde(default = "default_expected_codes")]
    pub expected_codes: String,
}
