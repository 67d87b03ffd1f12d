//! Local state store
//!
//! The driver never owns resource records. It reads pending VIPs and writes
//! statuses through [`StatusStore`], keyed by resource id.

mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Pool, ResourceKind, Status};

pub use memory::{Entity, MemoryStore, PoolMonitorAssociation, Record};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: ResourceKind, id: String },

    #[error("health monitor {monitor_id} is not associated with pool {pool_id}")]
    AssociationNotFound { monitor_id: String, pool_id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Filter for pool queries; `None` fields match everything
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolFilter {
    pub tenant_id: Option<String>,
    pub subnet_id: Option<String>,
}

impl PoolFilter {
    pub fn matches(&self, pool: &Pool) -> bool {
        self.tenant_id.as_deref().is_none_or(|t| t == pool.tenant_id)
            && self.subnet_id.as_deref().is_none_or(|s| s == pool.subnet_id)
    }
}

#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Set the status (and optional description) of a resource
    async fn update_status(
        &self,
        kind: ResourceKind,
        id: &str,
        status: Status,
        description: Option<String>,
    ) -> Result<()>;

    /// Remove a resource record
    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()>;

    /// Set the status of a monitor's attachment to a pool
    async fn update_pool_health_monitor(
        &self,
        monitor_id: &str,
        pool_id: &str,
        status: Status,
        description: &str,
    ) -> Result<()>;

    /// Remove a monitor's attachment to a pool
    async fn delete_pool_health_monitor(&self, monitor_id: &str, pool_id: &str) -> Result<()>;

    /// Ids of all VIPs currently in `status`
    async fn list_vips_with_status(&self, status: &Status) -> Result<Vec<String>>;

    async fn list_pools(&self, filter: &PoolFilter) -> Result<Vec<Pool>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(tenant_id: &str, subnet_id: &str) -> Pool {
        Pool {
            id: "p1".to_string(),
            tenant_id: tenant_id.to_string(),
            name: "backend".to_string(),
            description: String::new(),
            subnet_id: subnet_id.to_string(),
            vip_id: None,
            protocol: "HTTP".to_string(),
            lb_method: "ROUND_ROBIN".to_string(),
            admin_state_up: true,
        }
    }

    #[test]
    fn test_empty_filter_matches_any_pool() {
        let filter = PoolFilter::default();
        assert!(filter.matches(&pool("tenant-a", "s1")));
        assert!(filter.matches(&pool("", "")));
    }

    #[test]
    fn test_filter_fields_must_all_match() {
        let by_tenant = PoolFilter {
            tenant_id: Some("tenant-a".to_string()),
            subnet_id: None,
        };
        assert!(by_tenant.matches(&pool("tenant-a", "s2")));
        assert!(!by_tenant.matches(&pool("tenant-b", "s1")));

        let by_both = PoolFilter {
            tenant_id: Some("tenant-a".to_string()),
            subnet_id: Some("s1".to_string()),
        };
        assert!(by_both.matches(&pool("tenant-a", "s1")));
        assert!(!by_both.matches(&pool("tenant-a", "s2")));
        assert!(!by_both.matches(&pool("tenant-b", "s1")));
    }
}
