//! HTTP handlers for the REST API
//!
//! Handlers play the part of the owning plugin: they keep the resource
//! records in the store and hand every change to the [`Driver`] once the
//! record exists.
//!
//! [`Driver`]: crate::driver::Driver

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, instrument, warn};

use crate::driver::Transition;
use crate::model::{HealthMonitor, Member, Pool, PoolStats, ResourceKind, Status, Vip};
use crate::store::{Entity, PoolFilter, PoolMonitorAssociation, Record, StatusStore, StoreError};
use crate::Error;

use super::dto::{ErrorResponse, HealthResponse, ListResponse, PoolQuery};
use super::ApiState;

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = std::result::Result<T, ApiError>;

fn not_found(kind: ResourceKind, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(
            "not_found",
            &format!("{kind} {id} not found"),
        )),
    )
}

fn conflict(kind: ResourceKind, id: &str) -> ApiError {
    (
        StatusCode::CONFLICT,
        Json(ErrorResponse::new(
            "already_exists",
            &format!("{kind} {id} already exists"),
        )),
    )
}

fn driver_error(e: Error) -> ApiError {
    match e {
        Error::Store(StoreError::NotFound { kind, id }) => not_found(kind, &id),
        Error::Store(err @ StoreError::AssociationNotFound { .. }) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("not_found", &err.to_string())),
        ),
        e => {
            error!("Driver operation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("driver_failed", &e.to_string())),
            )
        }
    }
}

async fn load_record(state: &ApiState, kind: ResourceKind, id: &str) -> ApiResult<Record> {
    state
        .store
        .get(kind, id)
        .await
        .ok_or_else(|| not_found(kind, id))
}

async fn ensure_absent(state: &ApiState, kind: ResourceKind, id: &str) -> ApiResult<()> {
    match state.store.get(kind, id).await {
        Some(_) => Err(conflict(kind, id)),
        None => Ok(()),
    }
}

async fn load_vip(state: &ApiState, id: &str) -> ApiResult<Vip> {
    match load_record(state, ResourceKind::Vip, id).await?.entity {
        Entity::Vip(vip) => Ok(vip),
        _ => Err(not_found(ResourceKind::Vip, id)),
    }
}

async fn load_pool(state: &ApiState, id: &str) -> ApiResult<Pool> {
    match load_record(state, ResourceKind::Pool, id).await?.entity {
        Entity::Pool(pool) => Ok(pool),
        _ => Err(not_found(ResourceKind::Pool, id)),
    }
}

async fn load_member(state: &ApiState, id: &str) -> ApiResult<Member> {
    match load_record(state, ResourceKind::Member, id).await?.entity {
        Entity::Member(member) => Ok(member),
        _ => Err(not_found(ResourceKind::Member, id)),
    }
}

async fn load_monitor(state: &ApiState, id: &str) -> ApiResult<HealthMonitor> {
    match load_record(state, ResourceKind::HealthMonitor, id)
        .await?
        .entity
    {
        Entity::HealthMonitor(monitor) => Ok(monitor),
        _ => Err(not_found(ResourceKind::HealthMonitor, id)),
    }
}

async fn load_association(
    state: &ApiState,
    monitor_id: &str,
    pool_id: &str,
) -> ApiResult<PoolMonitorAssociation> {
    state
        .store
        .get_association(monitor_id, pool_id)
        .await
        .ok_or_else(|| {
            driver_error(Error::Store(StoreError::AssociationNotFound {
                monitor_id: monitor_id.to_string(),
                pool_id: pool_id.to_string(),
            }))
        })
}

async fn replace(state: &ApiState, entity: Entity) -> ApiResult<()> {
    state
        .store
        .replace_entity(entity)
        .await
        .map(|_| ())
        .map_err(|e| driver_error(e.into()))
}

/// `204` once the record is gone, otherwise the record carrying `ERROR`
async fn deletion_response(
    state: &ApiState,
    transition: &Transition,
    kind: ResourceKind,
    id: &str,
) -> ApiResult<Response> {
    if transition.is_failure() {
        Ok(Json(load_record(state, kind, id).await?).into_response())
    } else {
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}

/// Health check endpoint
#[instrument]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// VIP ids still waiting for the Control Center
#[instrument(skip(state))]
pub async fn list_pending_vips(State(state): State<Arc<ApiState>>) -> Json<ListResponse<String>> {
    Json(state.driver.pending().snapshot().await.into())
}

#[instrument(skip(state, vip), fields(id = %vip.id))]
pub async fn create_vip(
    State(state): State<Arc<ApiState>>,
    Json(vip): Json<Vip>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    ensure_absent(&state, ResourceKind::Vip, &vip.id).await?;
    state
        .store
        .insert(Entity::Vip(vip.clone()), Status::PendingCreate)
        .await;
    state.driver.create_vip(&vip).await.map_err(driver_error)?;

    let record = load_record(&state, ResourceKind::Vip, &vip.id).await?;
    Ok((StatusCode::ACCEPTED, Json(record)))
}

#[instrument(skip(state))]
pub async fn get_vip(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Record>> {
    Ok(Json(load_record(&state, ResourceKind::Vip, &id).await?))
}

#[instrument(skip(state, vip))]
pub async fn update_vip(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(mut vip): Json<Vip>,
) -> ApiResult<Json<Record>> {
    let old = load_vip(&state, &id).await?;
    vip.id = id.clone();
    replace(&state, Entity::Vip(vip.clone())).await?;
    state
        .driver
        .update_vip(&old, &vip)
        .await
        .map_err(driver_error)?;

    Ok(Json(load_record(&state, ResourceKind::Vip, &id).await?))
}

#[instrument(skip(state))]
pub async fn delete_vip(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let vip = load_vip(&state, &id).await?;
    let transition = state.driver.delete_vip(&vip).await.map_err(driver_error)?;
    deletion_response(&state, &transition, ResourceKind::Vip, &id).await
}

#[instrument(skip(state, pool), fields(id = %pool.id))]
pub async fn create_pool(
    State(state): State<Arc<ApiState>>,
    Json(pool): Json<Pool>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    ensure_absent(&state, ResourceKind::Pool, &pool.id).await?;
    state
        .store
        .insert(Entity::Pool(pool.clone()), Status::PendingCreate)
        .await;
    state.driver.create_pool(&pool).await.map_err(driver_error)?;

    let record = load_record(&state, ResourceKind::Pool, &pool.id).await?;
    Ok((StatusCode::ACCEPTED, Json(record)))
}

/// List pools, optionally narrowed to a tenant and subnet
#[instrument(skip(state))]
pub async fn list_pools(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PoolQuery>,
) -> ApiResult<Json<ListResponse<Pool>>> {
    let pools = match (&query.tenant_id, &query.subnet_id) {
        (Some(tenant_id), Some(subnet_id)) => state
            .driver
            .pools_on_subnet(tenant_id, subnet_id)
            .await
            .map_err(driver_error)?,
        _ => {
            let filter = PoolFilter {
                tenant_id: query.tenant_id,
                subnet_id: query.subnet_id,
            };
            state
                .store
                .list_pools(&filter)
                .await
                .map_err(|e| driver_error(e.into()))?
        }
    };
    Ok(Json(pools.into()))
}

#[instrument(skip(state))]
pub async fn get_pool(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Record>> {
    Ok(Json(load_record(&state, ResourceKind::Pool, &id).await?))
}

#[instrument(skip(state, pool))]
pub async fn update_pool(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(mut pool): Json<Pool>,
) -> ApiResult<Json<Record>> {
    let old = load_pool(&state, &id).await?;
    pool.id = id.clone();
    replace(&state, Entity::Pool(pool.clone())).await?;
    state
        .driver
        .update_pool(&old, &pool)
        .await
        .map_err(driver_error)?;

    Ok(Json(load_record(&state, ResourceKind::Pool, &id).await?))
}

#[instrument(skip(state))]
pub async fn delete_pool(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let pool = load_pool(&state, &id).await?;
    let transition = state.driver.delete_pool(&pool).await.map_err(driver_error)?;
    deletion_response(&state, &transition, ResourceKind::Pool, &id).await
}

#[instrument(skip(state))]
pub async fn pool_stats(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<PoolStats>> {
    let pool = load_pool(&state, &id).await?;
    match state.driver.stats(&pool.tenant_id, &pool.id).await {
        Some(stats) => Ok(Json(stats)),
        None => {
            warn!("No statistics available for pool {}", id);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::new(
                    "stats_unavailable",
                    &format!("statistics for pool {id} could not be retrieved"),
                )),
            ))
        }
    }
}

#[instrument(skip(state, member), fields(id = %member.id))]
pub async fn create_member(
    State(state): State<Arc<ApiState>>,
    Json(member): Json<Member>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    ensure_absent(&state, ResourceKind::Member, &member.id).await?;
    state
        .store
        .insert(Entity::Member(member.clone()), Status::PendingCreate)
        .await;
    state
        .driver
        .create_member(&member)
        .await
        .map_err(driver_error)?;

    let record = load_record(&state, ResourceKind::Member, &member.id).await?;
    Ok((StatusCode::ACCEPTED, Json(record)))
}

#[instrument(skip(state))]
pub async fn get_member(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Record>> {
    Ok(Json(load_record(&state, ResourceKind::Member, &id).await?))
}

#[instrument(skip(state, member))]
pub async fn update_member(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(mut member): Json<Member>,
) -> ApiResult<Json<Record>> {
    let old = load_member(&state, &id).await?;
    member.id = id.clone();
    replace(&state, Entity::Member(member.clone())).await?;
    state
        .driver
        .update_member(&old, &member)
        .await
        .map_err(driver_error)?;

    Ok(Json(load_record(&state, ResourceKind::Member, &id).await?))
}

#[instrument(skip(state))]
pub async fn delete_member(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let member = load_member(&state, &id).await?;
    let transition = state
        .driver
        .delete_member(&member)
        .await
        .map_err(driver_error)?;
    deletion_response(&state, &transition, ResourceKind::Member, &id).await
}

/// Attach a health monitor to a pool, creating the monitor record if needed
#[instrument(skip(state, monitor), fields(id = %monitor.id))]
pub async fn create_pool_health_monitor(
    State(state): State<Arc<ApiState>>,
    Path(pool_id): Path<String>,
    Json(monitor): Json<HealthMonitor>,
) -> ApiResult<(StatusCode, Json<PoolMonitorAssociation>)> {
    load_pool(&state, &pool_id).await?;
    if state
        .store
        .get_association(&monitor.id, &pool_id)
        .await
        .is_some()
    {
        return Err(conflict(ResourceKind::HealthMonitor, &monitor.id));
    }

    let entity = Entity::HealthMonitor(monitor.clone());
    if state
        .store
        .get(ResourceKind::HealthMonitor, &monitor.id)
        .await
        .is_some()
    {
        replace(&state, entity).await?;
    } else {
        state.store.insert(entity, Status::Active).await;
    }
    state.store.insert_association(&monitor.id, &pool_id).await;

    state
        .driver
        .create_pool_health_monitor(&monitor, &pool_id)
        .await
        .map_err(driver_error)?;

    let association = load_association(&state, &monitor.id, &pool_id).await?;
    Ok((StatusCode::ACCEPTED, Json(association)))
}

#[instrument(skip(state, monitor))]
pub async fn update_pool_health_monitor(
    State(state): State<Arc<ApiState>>,
    Path((pool_id, id)): Path<(String, String)>,
    Json(mut monitor): Json<HealthMonitor>,
) -> ApiResult<Json<PoolMonitorAssociation>> {
    let old = load_monitor(&state, &id).await?;
    load_association(&state, &id, &pool_id).await?;
    monitor.id = id.clone();
    replace(&state, Entity::HealthMonitor(monitor.clone())).await?;
    state
        .driver
        .update_pool_health_monitor(&old, &monitor, &pool_id)
        .await
        .map_err(driver_error)?;

    Ok(Json(load_association(&state, &id, &pool_id).await?))
}

#[instrument(skip(state))]
pub async fn delete_pool_health_monitor(
    State(state): State<Arc<ApiState>>,
    Path((pool_id, id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let monitor = load_monitor(&state, &id).await?;
    load_association(&state, &id, &pool_id).await?;
    let transition = state
        .driver
        .delete_pool_health_monitor(&monitor, &pool_id)
        .await
        .map_err(driver_error)?;

    if transition.is_failure() {
        Ok(Json(load_association(&state, &id, &pool_id).await?).into_response())
    } else {
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
