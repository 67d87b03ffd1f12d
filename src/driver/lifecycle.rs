//! Translation of local mutations into Control Center calls
//!
//! Every operation issues one remote call and returns the [`Transition`] the
//! caller must persist. Remote failures are folded into an `ERROR` status and
//! never returned as errors.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::payload;
use super::pending::PendingVips;
use crate::model::{HealthMonitor, Member, Pool, PoolStats, ResourceKind, Status, Vip};
use crate::ncc::{paths, NccError, NccResponse, RemoteClient};
use crate::network::{resolve_placement, NetworkInfo};

/// Local effect of a lifecycle operation
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    /// Write `status` for the resource
    SetStatus {
        kind: ResourceKind,
        id: String,
        status: Status,
        error: Option<String>,
    },
    /// Remote delete succeeded; drop the local record
    Remove { kind: ResourceKind, id: String },
    /// Write `status` for a monitor's attachment to a pool
    SetMonitorStatus {
        monitor_id: String,
        pool_id: String,
        status: Status,
        error: Option<String>,
    },
    /// Remote delete succeeded; drop the monitor's attachment to the pool
    RemoveMonitor { monitor_id: String, pool_id: String },
}

impl Transition {
    /// Status written by this transition, if any
    pub fn status(&self) -> Option<&Status> {
        match self {
            Transition::SetStatus { status, .. } | Transition::SetMonitorStatus { status, .. } => {
                Some(status)
            }
            _ => None,
        }
    }

    /// Remote failure detail, if the operation failed
    pub fn error(&self) -> Option<&str> {
        match self {
            Transition::SetStatus { error, .. } | Transition::SetMonitorStatus { error, .. } => {
                error.as_deref()
            }
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error().is_some()
    }
}

fn set_status(
    kind: ResourceKind,
    id: &str,
    result: Result<NccResponse, NccError>,
    on_success: Status,
) -> Transition {
    let (status, error) = match result {
        Ok(_) => (on_success, None),
        Err(e) => (Status::Error, Some(e.to_string())),
    };
    Transition::SetStatus {
        kind,
        id: id.to_string(),
        status,
        error,
    }
}

fn set_monitor_status(
    monitor_id: &str,
    pool_id: &str,
    result: Result<NccResponse, NccError>,
) -> Transition {
    let (status, error) = match result {
        Ok(_) => (Status::Active, None),
        Err(e) => (Status::Error, Some(e.to_string())),
    };
    Transition::SetMonitorStatus {
        monitor_id: monitor_id.to_string(),
        pool_id: pool_id.to_string(),
        status,
        error,
    }
}

fn record_call<T>(operation: &str, id: &str, result: &Result<T, NccError>) {
    match result {
        Ok(_) => debug!("{} {} accepted by Control Center", operation, id),
        Err(e) => warn!("{} {} failed: {}", operation, id, e),
    }
    crate::metrics::inc_remote_call(operation, result.is_ok());
}

/// Issues Control Center calls for VIPs, pools, members and health monitors
#[derive(Clone)]
pub struct Lifecycle {
    client: Arc<dyn RemoteClient>,
    networks: Arc<dyn NetworkInfo>,
    pending: PendingVips,
}

impl Lifecycle {
    pub fn new(
        client: Arc<dyn RemoteClient>,
        networks: Arc<dyn NetworkInfo>,
        pending: PendingVips,
    ) -> Self {
        Self {
            client,
            networks,
            pending,
        }
    }

    pub fn pending(&self) -> &PendingVips {
        &self.pending
    }

    /// Creation payload plus network placement for the entity's subnet
    async fn placed(
        &self,
        mut attrs: Map<String, Value>,
        subnet_id: &str,
    ) -> Result<Map<String, Value>, String> {
        let placement = resolve_placement(self.networks.as_ref(), subnet_id)
            .await
            .map_err(|e| e.to_string())?;
        attrs.extend(placement.into_payload());
        Ok(attrs)
    }

    async fn create(
        &self,
        kind: ResourceKind,
        tenant_id: &str,
        path: &str,
        body: &Map<String, Value>,
    ) -> Result<NccResponse, NccError> {
        let rendered = Value::Object(body.clone());
        debug!("{} creation: {}", kind, rendered);
        self.client
            .create_resource(tenant_id, path, kind.resource_key(), body)
            .await
    }

    async fn update(
        &self,
        kind: ResourceKind,
        tenant_id: &str,
        path: &str,
        body: &Map<String, Value>,
    ) -> Result<NccResponse, NccError> {
        let rendered = Value::Object(body.clone());
        debug!("{} update at {}: {}", kind, path, rendered);
        self.client
            .update_resource(tenant_id, path, kind.resource_key(), body)
            .await
    }

    // ── VIP ────────────────────────────────────────────────────────────────

    /// A created VIP stays `PENDING_CREATE` until the collector sees the
    /// Control Center report something else.
    pub async fn create_vip(&self, vip: &Vip) -> Transition {
        let mut attrs = payload::vip_for_creation(vip);
        if let Some(port_id) = &vip.port_id {
            attrs.insert("port_id".into(), Value::String(port_id.clone()));
        }
        let body = match self.placed(attrs, &vip.subnet_id).await {
            Ok(body) => body,
            Err(e) => {
                warn!("vip {}: network lookup failed: {}", vip.id, e);
                return Transition::SetStatus {
                    kind: ResourceKind::Vip,
                    id: vip.id.clone(),
                    status: Status::Error,
                    error: Some(e),
                };
            }
        };

        let result = self
            .create(
                ResourceKind::Vip,
                &vip.tenant_id,
                &paths::collection_path(ResourceKind::Vip),
                &body,
            )
            .await;
        record_call("create_vip", &vip.id, &result);

        if result.is_ok() {
            self.pending.insert(&vip.id).await;
        }
        set_status(ResourceKind::Vip, &vip.id, result, Status::PendingCreate)
    }

    pub async fn update_vip(&self, old: &Vip, vip: &Vip) -> Transition {
        let body = payload::vip_for_update(vip);
        let result = self
            .update(
                ResourceKind::Vip,
                &vip.tenant_id,
                &paths::resource_path(ResourceKind::Vip, &old.id),
                &body,
            )
            .await;
        record_call("update_vip", &old.id, &result);
        set_status(ResourceKind::Vip, &old.id, result, Status::Active)
    }

    pub async fn delete_vip(&self, vip: &Vip) -> Transition {
        self.delete(ResourceKind::Vip, &vip.tenant_id, &vip.id, "delete_vip")
            .await
    }

    // ── Pool ───────────────────────────────────────────────────────────────

    pub async fn create_pool(&self, pool: &Pool) -> Transition {
        let body = match self
            .placed(payload::pool_for_creation(pool), &pool.subnet_id)
            .await
        {
            Ok(body) => body,
            Err(e) => {
                warn!("pool {}: network lookup failed: {}", pool.id, e);
                return Transition::SetStatus {
                    kind: ResourceKind::Pool,
                    id: pool.id.clone(),
                    status: Status::Error,
                    error: Some(e),
                };
            }
        };

        let result = self
            .create(
                ResourceKind::Pool,
                &pool.tenant_id,
                &paths::collection_path(ResourceKind::Pool),
                &body,
            )
            .await;
        record_call("create_pool", &pool.id, &result);
        set_status(ResourceKind::Pool, &pool.id, result, Status::Active)
    }

    pub async fn update_pool(&self, old: &Pool, pool: &Pool) -> Transition {
        let body = payload::pool_for_update(pool);
        let result = self
            .update(
                ResourceKind::Pool,
                &pool.tenant_id,
                &paths::resource_path(ResourceKind::Pool, &old.id),
                &body,
            )
            .await;
        record_call("update_pool", &old.id, &result);
        set_status(ResourceKind::Pool, &old.id, result, Status::Active)
    }

    pub async fn delete_pool(&self, pool: &Pool) -> Transition {
        self.delete(ResourceKind::Pool, &pool.tenant_id, &pool.id, "delete_pool")
            .await
    }

    // ── Member ─────────────────────────────────────────────────────────────

    pub async fn create_member(&self, member: &Member) -> Transition {
        let body = payload::member_for_creation(member);
        let rendered = Value::Object(body.clone());
        info!("member creation: {}", rendered);
        let result = self
            .create(
                ResourceKind::Member,
                &member.tenant_id,
                &paths::collection_path(ResourceKind::Member),
                &body,
            )
            .await;
        record_call("create_member", &member.id, &result);
        set_status(ResourceKind::Member, &member.id, result, Status::Active)
    }

    pub async fn update_member(&self, old: &Member, member: &Member) -> Transition {
        let body = payload::member_for_update(member);
        let result = self
            .update(
                ResourceKind::Member,
                &member.tenant_id,
                &paths::resource_path(ResourceKind::Member, &old.id),
                &body,
            )
            .await;
        record_call("update_member", &old.id, &result);
        set_status(ResourceKind::Member, &old.id, result, Status::Active)
    }

    pub async fn delete_member(&self, member: &Member) -> Transition {
        self.delete(
            ResourceKind::Member,
            &member.tenant_id,
            &member.id,
            "delete_member",
        )
        .await
    }

    // ── Health monitor ─────────────────────────────────────────────────────

    pub async fn create_pool_health_monitor(
        &self,
        monitor: &HealthMonitor,
        pool_id: &str,
    ) -> Transition {
        let body = payload::monitor_for_creation(monitor);
        let result = self
            .create(
                ResourceKind::HealthMonitor,
                &monitor.tenant_id,
                &paths::pool_monitors_path(pool_id),
                &body,
            )
            .await;
        record_call("create_health_monitor", &monitor.id, &result);
        set_monitor_status(&monitor.id, pool_id, result)
    }

    pub async fn update_pool_health_monitor(
        &self,
        old: &HealthMonitor,
        monitor: &HealthMonitor,
        pool_id: &str,
    ) -> Transition {
        let body = payload::monitor_for_update(monitor);
        let result = self
            .update(
                ResourceKind::HealthMonitor,
                &monitor.tenant_id,
                &paths::resource_path(ResourceKind::HealthMonitor, &old.id),
                &body,
            )
            .await;
        record_call("update_health_monitor", &old.id, &result);
        set_monitor_status(&old.id, pool_id, result)
    }

    pub async fn delete_pool_health_monitor(
        &self,
        monitor: &HealthMonitor,
        pool_id: &str,
    ) -> Transition {
        debug!("health monitor {} removal for pool {}", monitor.id, pool_id);
        let result = self
            .client
            .remove_resource(
                &monitor.tenant_id,
                &paths::pool_monitor_path(pool_id, &monitor.id),
            )
            .await;
        record_call("delete_health_monitor", &monitor.id, &result);

        match result {
            Ok(_) => Transition::RemoveMonitor {
                monitor_id: monitor.id.clone(),
                pool_id: pool_id.to_string(),
            },
            Err(e) => Transition::SetMonitorStatus {
                monitor_id: monitor.id.clone(),
                pool_id: pool_id.to_string(),
                status: Status::Error,
                error: Some(e.to_string()),
            },
        }
    }

    // ── Shared ─────────────────────────────────────────────────────────────

    async fn delete(
        &self,
        kind: ResourceKind,
        tenant_id: &str,
        id: &str,
        operation: &str,
    ) -> Transition {
        debug!("{} removal: {}", kind, id);
        let result = self
            .client
            .remove_resource(tenant_id, &paths::resource_path(kind, id))
            .await;
        record_call(operation, id, &result);

        match result {
            Ok(_) => Transition::Remove {
                kind,
                id: id.to_string(),
            },
            Err(e) => Transition::SetStatus {
                kind,
                id: id.to_string(),
                status: Status::Error,
                error: Some(e.to_string()),
            },
        }
    }

    /// Pool statistics, or `None` when the Control Center cannot provide them
    pub async fn stats(&self, tenant_id: &str, pool_id: &str) -> Option<PoolStats> {
        debug!("pool stats retrieval: {}", pool_id);
        let result = self
            .client
            .retrieve_resource(tenant_id, &paths::pool_stats_path(pool_id))
            .await;
        record_call("retrieve_pool_stats", pool_id, &result);

        let parsed = result.and_then(|response| response.json());
        match parsed {
            Ok(Value::Object(mut body)) => match body.remove("stats") {
                Some(Value::Object(stats)) => Some(stats),
                _ => {
                    debug!("stats of pool {} missing from response", pool_id);
                    None
                }
            },
            Ok(_) => None,
            Err(e) => {
                debug!("stats of pool {} errored out: {}", pool_id, e);
                None
            }
        }
    }
}
