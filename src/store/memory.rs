//! In-process [`StatusStore`] used by the service binary and tests

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::{PoolFilter, Result, StatusStore, StoreError};
use crate::model::{HealthMonitor, Member, Pool, ResourceKind, Status, Vip};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entity {
    Vip(Vip),
    Pool(Pool),
    Member(Member),
    HealthMonitor(HealthMonitor),
}

impl Entity {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Entity::Vip(_) => ResourceKind::Vip,
            Entity::Pool(_) => ResourceKind::Pool,
            Entity::Member(_) => ResourceKind::Member,
            Entity::HealthMonitor(_) => ResourceKind::HealthMonitor,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Vip(v) => &v.id,
            Entity::Pool(p) => &p.id,
            Entity::Member(m) => &m.id,
            Entity::HealthMonitor(hm) => &hm.id,
        }
    }
}

/// Stored resource with its current status
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    pub entity: Entity,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Attachment of a health monitor to a pool
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PoolMonitorAssociation {
    pub monitor_id: String,
    pub pool_id: String,
    pub status: Status,
    pub status_description: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<ResourceKind, HashMap<String, Record>>>,
    associations: RwLock<HashMap<(String, String), PoolMonitorAssociation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record with the given status
    pub async fn insert(&self, entity: Entity, status: Status) -> Record {
        let record = Record {
            entity,
            status,
            status_description: None,
            updated_at: Utc::now(),
        };
        self.records
            .write()
            .await
            .entry(record.entity.kind())
            .or_default()
            .insert(record.entity.id().to_string(), record.clone());
        record
    }

    /// Replace the entity of an existing record, keeping its status
    pub async fn replace_entity(&self, entity: Entity) -> Result<Record> {
        let kind = entity.kind();
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&kind)
            .and_then(|by_id| by_id.get_mut(entity.id()))
            .ok_or_else(|| StoreError::NotFound {
                kind,
                id: entity.id().to_string(),
            })?;
        record.entity = entity;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    pub async fn get(&self, kind: ResourceKind, id: &str) -> Option<Record> {
        self.records
            .read()
            .await
            .get(&kind)
            .and_then(|by_id| by_id.get(id))
            .cloned()
    }

    /// All records of a kind, ordered by id
    pub async fn list(&self, kind: ResourceKind) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .records
            .read()
            .await
            .get(&kind)
            .map(|by_id| by_id.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by(|a, b| a.entity.id().cmp(b.entity.id()));
        records
    }

    /// Attach a monitor to a pool in `PENDING_CREATE`
    pub async fn insert_association(&self, monitor_id: &str, pool_id: &str) -> PoolMonitorAssociation {
        let association = PoolMonitorAssociation {
            monitor_id: monitor_id.to_string(),
            pool_id: pool_id.to_string(),
            status: Status::PendingCreate,
            status_description: String::new(),
            updated_at: Utc::now(),
        };
        self.associations.write().await.insert(
            (monitor_id.to_string(), pool_id.to_string()),
            association.clone(),
        );
        association
    }

    pub async fn get_association(&self, monitor_id: &str, pool_id: &str) -> Option<PoolMonitorAssociation> {
        self.associations
            .read()
            .await
            .get(&(monitor_id.to_string(), pool_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn update_status(
        &self,
        kind: ResourceKind,
        id: &str,
        status: Status,
        description: Option<String>,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&kind)
            .and_then(|by_id| by_id.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                kind,
                id: id.to_string(),
            })?;

        debug!("{} {}: {} -> {}", kind, id, record.status, status);
        record.status = status;
        if description.is_some() {
            record.status_description = description;
        }
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()> {
        let removed = self
            .records
            .write()
            .await
            .get_mut(&kind)
            .and_then(|by_id| by_id.remove(id));

        match removed {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                kind,
                id: id.to_string(),
            }),
        }
    }

    async fn update_pool_health_monitor(
        &self,
        monitor_id: &str,
        pool_id: &str,
        status: Status,
        description: &str,
    ) -> Result<()> {
        let mut associations = self.associations.write().await;
        let association = associations
            .get_mut(&(monitor_id.to_string(), pool_id.to_string()))
            .ok_or_else(|| StoreError::AssociationNotFound {
                monitor_id: monitor_id.to_string(),
                pool_id: pool_id.to_string(),
            })?;

        association.status = status;
        association.status_description = description.to_string();
        association.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_pool_health_monitor(&self, monitor_id: &str, pool_id: &str) -> Result<()> {
        self.associations
            .write()
            .await
            .remove(&(monitor_id.to_string(), pool_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::AssociationNotFound {
                monitor_id: monitor_id.to_string(),
                pool_id: pool_id.to_string(),
            })
    }

    async fn list_vips_with_status(&self, status: &Status) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .records
            .read()
            .await
            .get(&ResourceKind::Vip)
            .map(|vips| {
                vips.values()
                    .filter(|r| &r.status == status)
                    .map(|r| r.entity.id().to_string())
                    .collect()
            })
            .unwrap_or_default();
        ids.sort();
        Ok(ids)
    }

    async fn list_pools(&self, filter: &PoolFilter) -> Result<Vec<Pool>> {
        Ok(self
            .list(ResourceKind::Pool)
            .await
            .into_iter()
            .filter_map(|r| match r.entity {
                Entity::Pool(pool) if filter.matches(&pool) => Some(pool),
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vip(id: &str) -> Entity {
        Entity::Vip(Vip {
            id: id.to_string(),
            tenant_id: "t1".to_string(),
            name: String::new(),
            description: String::new(),
            subnet_id: "s1".to_string(),
            address: "10.0.0.10".to_string(),
            port_id: None,
            protocol: "HTTP".to_string(),
            protocol_port: 80,
            pool_id: None,
            connection_limit: -1,
            admin_state_up: true,
            session_persistence: None,
        })
    }

    fn pool(id: &str, tenant: &str, subnet: &str) -> Entity {
        Entity::Pool(Pool {
            id: id.to_string(),
            tenant_id: tenant.to_string(),
            name: String::new(),
            description: String::new(),
            subnet_id: subnet.to_string(),
            vip_id: None,
            protocol: "HTTP".to_string(),
            lb_method: "ROUND_ROBIN".to_string(),
            admin_state_up: true,
        })
    }

    #[tokio::test]
    async fn test_update_status_and_description() {
        let store = MemoryStore::new();
        store.insert(vip("v1"), Status::PendingCreate).await;

        store
            .update_status(ResourceKind::Vip, "v1", Status::Active, None)
            .await
            .unwrap();
        let record = store.get(ResourceKind::Vip, "v1").await.unwrap();
        assert_eq!(record.status, Status::Active);
        assert!(record.status_description.is_none());

        store
            .update_status(
                ResourceKind::Vip,
                "v1",
                Status::from("DOWN"),
                Some("health check failed".to_string()),
            )
            .await
            .unwrap();
        let record = store.get(ResourceKind::Vip, "v1").await.unwrap();
        assert_eq!(record.status.as_str(), "DOWN");
        assert_eq!(record.status_description.as_deref(), Some("health check failed"));
    }

    #[tokio::test]
    async fn test_update_unknown_resource_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_status(ResourceKind::Member, "m404", Status::Active, None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::NotFound {
                kind: ResourceKind::Member,
                id: "m404".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let store = MemoryStore::new();
        store.insert(vip("v1"), Status::Active).await;

        store.delete(ResourceKind::Vip, "v1").await.unwrap();
        assert!(store.get(ResourceKind::Vip, "v1").await.is_none());
        assert!(store.delete(ResourceKind::Vip, "v1").await.is_err());
    }

    #[tokio::test]
    async fn test_list_vips_with_status() {
        let store = MemoryStore::new();
        store.insert(vip("v2"), Status::PendingCreate).await;
        store.insert(vip("v1"), Status::PendingCreate).await;
        store.insert(vip("v3"), Status::Active).await;

        let pending = store
            .list_vips_with_status(&Status::PendingCreate)
            .await
            .unwrap();
        assert_eq!(pending, vec!["v1".to_string(), "v2".to_string()]);
    }

    #[tokio::test]
    async fn test_list_pools_by_filter() {
        let store = MemoryStore::new();
        store.insert(pool("p1", "t1", "s1"), Status::Active).await;
        store.insert(pool("p2", "t1", "s2"), Status::Active).await;
        store.insert(pool("p3", "t2", "s1"), Status::Active).await;

        let filter = PoolFilter {
            tenant_id: Some("t1".to_string()),
            subnet_id: Some("s1".to_string()),
        };
        let pools = store.list_pools(&filter).await.unwrap();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].id, "p1");

        let all = store.list_pools(&PoolFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_pool_monitor_association_lifecycle() {
        let store = MemoryStore::new();
        store.insert_association("hm1", "p1").await;

        store
            .update_pool_health_monitor("hm1", "p1", Status::Active, "")
            .await
            .unwrap();
        let association = store.get_association("hm1", "p1").await.unwrap();
        assert_eq!(association.status, Status::Active);

        store.delete_pool_health_monitor("hm1", "p1").await.unwrap();
        assert!(store.get_association("hm1", "p1").await.is_none());
        assert!(store
            .update_pool_health_monitor("hm1", "p1", Status::Error, "")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_replace_entity_keeps_status() {
        let store = MemoryStore::new();
        store.insert(vip("v1"), Status::Error).await;

        let mut updated = vip("v1");
        if let Entity::Vip(v) = &mut updated {
            v.name = "renamed".to_string();
        }
        let record = store.replace_entity(updated.clone()).await.unwrap();
        assert_eq!(record.status, Status::Error);
        assert_eq!(record.entity, updated);
    }
}
