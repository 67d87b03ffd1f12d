//! Resource paths on the Control Center
//!
//! Health monitors are created and deleted under their pool but updated at
//! the top-level collection. The remote API resolves monitors this way, so
//! the asymmetry must be kept.

use crate::model::ResourceKind;

pub const RESOURCE_PREFIX: &str = "v2.0/lb";
pub const STATUS_PREFIX: &str = "oca/v1";
pub const MEMBER_STATUS: &str = "memberstatus";
pub const STATS: &str = "stats";

/// Tenant used for tenant-agnostic reads made by the status collector
pub const GLOBAL_TENANT: &str = "GLOBAL";

/// `v2.0/lb/{collection}`
pub fn collection_path(kind: ResourceKind) -> String {
    format!("{}/{}", RESOURCE_PREFIX, kind.collection())
}

/// `v2.0/lb/{collection}/{id}`
pub fn resource_path(kind: ResourceKind, id: &str) -> String {
    format!("{}/{}/{}", RESOURCE_PREFIX, kind.collection(), id)
}

/// `v2.0/lb/pools/{pool_id}/healthmonitors`
pub fn pool_monitors_path(pool_id: &str) -> String {
    format!(
        "{}/{}",
        resource_path(ResourceKind::Pool, pool_id),
        ResourceKind::HealthMonitor.collection()
    )
}

/// `v2.0/lb/pools/{pool_id}/healthmonitors/{monitor_id}`
pub fn pool_monitor_path(pool_id: &str, monitor_id: &str) -> String {
    format!("{}/{}", pool_monitors_path(pool_id), monitor_id)
}

/// `v2.0/lb/pools/{pool_id}/stats`
pub fn pool_stats_path(pool_id: &str) -> String {
    format!("{}/{}", resource_path(ResourceKind::Pool, pool_id), STATS)
}

/// `oca/v1/memberstatus?page={page}&size={size}`
pub fn member_status_page_path(page: u32, size: u32) -> String {
    format!("{STATUS_PREFIX}/{MEMBER_STATUS}?page={page}&size={size}")
}
