//! Request bodies sent to the Control Center
//!
//! Creation payloads are the identity fields merged with the update payload.
//! Update payloads carry only fields that may change after creation.

use serde_json::{json, Map, Value};

use crate::model::{HealthMonitor, Member, Pool, Vip};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub fn vip_for_update(vip: &Vip) -> Map<String, Value> {
    let mut attrs = object(json!({
        "name": vip.name,
        "description": vip.description,
        "pool_id": vip.pool_id,
        "connection_limit": vip.connection_limit,
        "admin_state_up": vip.admin_state_up,
    }));
    if let Some(persistence) = &vip.session_persistence {
        attrs.insert("session_persistence".into(), persistence.clone());
    }
    attrs
}

pub fn vip_for_creation(vip: &Vip) -> Map<String, Value> {
    let mut attrs = object(json!({
        "id": vip.id,
        "tenant_id": vip.tenant_id,
        "protocol": vip.protocol,
        "address": vip.address,
        "protocol_port": vip.protocol_port,
    }));
    attrs.extend(vip_for_update(vip));
    attrs
}

pub fn pool_for_update(pool: &Pool) -> Map<String, Value> {
    object(json!({
        "name": pool.name,
        "description": pool.description,
        "lb_method": pool.lb_method,
        "admin_state_up": pool.admin_state_up,
    }))
}

pub fn pool_for_creation(pool: &Pool) -> Map<String, Value> {
    let mut attrs = object(json!({
        "id": pool.id,
        "tenant_id": pool.tenant_id,
        "vip_id": pool.vip_id,
        "protocol": pool.protocol,
        "subnet_id": pool.subnet_id,
    }));
    attrs.extend(pool_for_update(pool));
    attrs
}

pub fn member_for_update(member: &Member) -> Map<String, Value> {
    object(json!({
        "pool_id": member.pool_id,
        "weight": member.weight,
        "admin_state_up": member.admin_state_up,
    }))
}

pub fn member_for_creation(member: &Member) -> Map<String, Value> {
    let mut attrs = object(json!({
        "id": member.id,
        "tenant_id": member.tenant_id,
        "address": member.address,
        "protocol_port": member.protocol_port,
    }));
    attrs.extend(member_for_update(member));
    attrs
}

/// HTTP method, URL path and expected codes only go out for HTTP(S) monitors
pub fn monitor_for_update(monitor: &HealthMonitor) -> Map<String, Value> {
    let mut attrs = object(json!({
        "delay": monitor.delay,
        "timeout": monitor.timeout,
        "max_retries": monitor.max_retries,
        "admin_state_up": monitor.admin_state_up,
    }));
    if monitor.monitor_type.is_http() {
        attrs.insert("http_method".into(), json!(monitor.http_method));
        attrs.insert("url_path".into(), json!(monitor.url_path));
        attrs.insert("expected_codes".into(), json!(monitor.expected_codes));
    }
    attrs
}

pub fn monitor_for_creation(monitor: &HealthMonitor) -> Map<String, Value> {
    let mut attrs = object(json!({
        "id": monitor.id,
        "tenant_id": monitor.tenant_id,
        "type": monitor.monitor_type,
    }));
    attrs.extend(monitor_for_update(monitor));
    attrs
}
