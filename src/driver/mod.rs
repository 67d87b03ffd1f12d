//! Load-balancer driver
//!
//! [`Lifecycle`] talks to the Control Center and decides the resulting
//! status; [`Driver`] persists that decision in the local store. Control
//! Center failures only ever show up as an `ERROR` status. Store failures
//! are returned to the caller.

pub mod lifecycle;
pub mod payload;
pub mod pending;


use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::model::{HealthMonitor, Member, Pool, PoolStats, Vip};
use crate::ncc::RemoteClient;
use crate::network::NetworkInfo;
use crate::store::{PoolFilter, StatusStore};

pub use lifecycle::{Lifecycle, Transition};
pub use pending::PendingVips;

#[derive(Clone)]
pub struct Driver {
    lifecycle: Lifecycle,
    store: Arc<dyn StatusStore>,
}

impl Driver {
    pub fn new(
        client: Arc<dyn RemoteClient>,
        store: Arc<dyn StatusStore>,
        networks: Arc<dyn NetworkInfo>,
        pending: PendingVips,
    ) -> Self {
        Self {
            lifecycle: Lifecycle::new(client, networks, pending),
            store,
        }
    }

    pub fn pending(&self) -> &PendingVips {
        self.lifecycle.pending()
    }

    /// Persist the outcome of a lifecycle operation
    pub async fn apply(&self, transition: &Transition) -> Result<()> {
        debug!("applying {:?}", transition);
        match transition {
            Transition::SetStatus {
                kind,
                id,
                status,
                error,
            } => {
                self.store
                    .update_status(*kind, id, status.clone(), error.clone())
                    .await?;
                crate::metrics::inc_status_write(kind.resource_key(), status.as_str());
            }
            Transition::Remove { kind, id } => {
                self.store.delete(*kind, id).await?;
            }
            Transition::SetMonitorStatus {
                monitor_id,
                pool_id,
                status,
                ..
            } => {
                self.store
                    .update_pool_health_monitor(monitor_id, pool_id, status.clone(), "")
                    .await?;
                crate::metrics::inc_status_write("healthmonitor", status.as_str());
            }
            Transition::RemoveMonitor {
                monitor_id,
                pool_id,
            } => {
                self.store
                    .delete_pool_health_monitor(monitor_id, pool_id)
                    .await?;
            }
        }
        Ok(())
    }

    async fn persist(&self, transition: Transition) -> Result<Transition> {
        self.apply(&transition).await?;
        Ok(transition)
    }

    pub async fn create_vip(&self, vip: &Vip) -> Result<Transition> {
        self.persist(self.lifecycle.create_vip(vip).await).await
    }

    pub async fn update_vip(&self, old: &Vip, vip: &Vip) -> Result<Transition> {
        self.persist(self.lifecycle.update_vip(old, vip).await).await
    }

    pub async fn delete_vip(&self, vip: &Vip) -> Result<Transition> {
        self.persist(self.lifecycle.delete_vip(vip).await).await
    }

    pub async fn create_pool(&self, pool: &Pool) -> Result<Transition> {
        self.persist(self.lifecycle.create_pool(pool).await).await
    }

    pub async fn update_pool(&self, old: &Pool, pool: &Pool) -> Result<Transition> {
        self.persist(self.lifecycle.update_pool(old, pool).await).await
    }

    pub async fn delete_pool(&self, pool: &Pool) -> Result<Transition> {
        self.persist(self.lifecycle.delete_pool(pool).await).await
    }

    pub async fn create_member(&self, member: &Member) -> Result<Transition> {
        self.persist(self.lifecycle.create_member(member).await).await
    }

    pub async fn update_member(&self, old: &Member, member: &Member) -> Result<Transition> {
        self.persist(self.lifecycle.update_member(old, member).await)
            .await
    }

    pub async fn delete_member(&self, member: &Member) -> Result<Transition> {
        self.persist(self.lifecycle.delete_member(member).await).await
    }

    pub async fn create_pool_health_monitor(
        &self,
        monitor: &HealthMonitor,
        pool_id: &str,
    ) -> Result<Transition> {
        self.persist(
            self.lifecycle
                .create_pool_health_monitor(monitor, pool_id)
                .await,
        )
        .await
    }

    pub async fn update_pool_health_monitor(
        &self,
        old: &HealthMonitor,
        monitor: &HealthMonitor,
        pool_id: &str,
    ) -> Result<Transition> {
        self.persist(
            self.lifecycle
                .update_pool_health_monitor(old, monitor, pool_id)
                .await,
        )
        .await
    }

    pub async fn delete_pool_health_monitor(
        &self,
        monitor: &HealthMonitor,
        pool_id: &str,
    ) -> Result<Transition> {
        self.persist(
            self.lifecycle
                .delete_pool_health_monitor(monitor, pool_id)
                .await,
        )
        .await
    }

    pub async fn stats(&self, tenant_id: &str, pool_id: &str) -> Option<PoolStats> {
        self.lifecycle.stats(tenant_id, pool_id).await
    }

    pub async fn pools_on_subnet(&self, tenant_id: &str, subnet_id: &str) -> Result<Vec<Pool>> {
        let filter = PoolFilter {
            tenant_id: Some(tenant_id.to_string()),
            subnet_id: Some(subnet_id.to_string()),
        };
        Ok(self.store.list_pools(&filter).await?)
    }
}
