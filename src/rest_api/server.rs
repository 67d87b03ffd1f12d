//! Axum HTTP server for the REST API

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{Error, Result};

use super::handlers;
use super::ApiState;

/// Metrics endpoint handler
#[cfg(feature = "metrics")]
async fn metrics_handler() -> std::result::Result<String, axum::http::StatusCode> {
    crate::metrics::encode_text().map_err(|_| axum::http::StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn build_router(state: Arc<ApiState>) -> Router {
    let router = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/pending-vips", get(handlers::list_pending_vips))
        .route("/api/v1/vips", post(handlers::create_vip))
        .route(
            "/api/v1/vips/{id}",
            get(handlers::get_vip)
                .put(handlers::update_vip)
                .delete(handlers::delete_vip),
        )
        .route(
            "/api/v1/pools",
            get(handlers::list_pools).post(handlers::create_pool),
        )
        .route(
            "/api/v1/pools/{pool_id}",
            get(handlers::get_pool)
                .put(handlers::update_pool)
                .delete(handlers::delete_pool),
        )
        .route("/api/v1/pools/{pool_id}/stats", get(handlers::pool_stats))
        .route(
            "/api/v1/pools/{pool_id}/healthmonitors",
            post(handlers::create_pool_health_monitor),
        )
        .route(
            "/api/v1/pools/{pool_id}/healthmonitors/{id}",
            put(handlers::update_pool_health_monitor)
                .delete(handlers::delete_pool_health_monitor),
        )
        .route("/api/v1/members", post(handlers::create_member))
        .route(
            "/api/v1/members/{id}",
            get(handlers::get_member)
                .put(handlers::update_member)
                .delete(handlers::delete_member),
        );

    #[cfg(feature = "metrics")]
    let router = router.route("/metrics", get(metrics_handler));

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Run the REST API server until `shutdown` resolves
pub async fn run_server<F>(state: Arc<ApiState>, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::ConfigError(format!("Failed to bind to {}: {}", addr, e)))?;
    info!("REST API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::ConfigError(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Driver, PendingVips};
    use crate::model::ResourceKind;
    use crate::ncc::paths;
    use crate::network::{NetworkEntry, StaticNetworkInfo};
    use crate::store::MemoryStore;
    use crate::testing::{FakeRemote, Op};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        remote: Arc<FakeRemote>,
        store: Arc<MemoryStore>,
    }

    fn test_app() -> TestApp {
        let remote = Arc::new(FakeRemote::new());
        let store = Arc::new(MemoryStore::new());
        let networks = Arc::new(StaticNetworkInfo::new(&[NetworkEntry {
            subnet_id: "s1".into(),
            network_id: "n1".into(),
            network_type: Some("vlan".into()),
            segmentation_id: Some(100),
        }]));
        let driver = Driver::new(
            remote.clone(),
            store.clone(),
            networks,
            PendingVips::new(),
        );
        let state = Arc::new(ApiState::new(driver, store.clone()));
        TestApp {
            router: build_router(state),
            remote,
            store,
        }
    }

    async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn vip_body(id: &str) -> Value {
        json!({
            "id": id,
            "tenant_id": "t1",
            "subnet_id": "s1",
            "address": "10.0.0.10",
            "port_id": "port-1",
            "protocol": "HTTP",
            "protocol_port": 80
        })
    }

    fn pool_body(id: &str) -> Value {
        json!({
            "id": id,
            "tenant_id": "t1",
            "subnet_id": "s1",
            "protocol": "HTTP",
            "lb_method": "ROUND_ROBIN"
        })
    }

    fn member_body(id: &str) -> Value {
        json!({
            "id": id,
            "tenant_id": "t1",
            "pool_id": "p1",
            "address": "10.0.1.5",
            "protocol_port": 8080
        })
    }

    fn monitor_body(id: &str) -> Value {
        json!({
            "id": id,
            "tenant_id": "t1",
            "type": "HTTP",
            "delay": 5,
            "timeout": 3,
            "max_retries": 3
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_create_vip_is_pending() {
        let app = test_app();
        let (status, body) = send(&app, "POST", "/api/v1/vips", Some(vip_body("v1"))).await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "PENDING_CREATE");
        assert_eq!(body["entity"]["id"], "v1");

        let (_, pending) = send(&app, "GET", "/api/v1/pending-vips", None).await;
        assert_eq!(pending["items"], json!(["v1"]));
        assert_eq!(pending["total"], 1);
    }

    #[tokio::test]
    async fn test_create_vip_remote_failure_is_error() {
        let app = test_app();
        app.remote
            .fail(Op::Create, &paths::collection_path(ResourceKind::Vip));

        let (status, body) = send(&app, "POST", "/api/v1/vips", Some(vip_body("v1"))).await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "ERROR");
        let (_, pending) = send(&app, "GET", "/api/v1/pending-vips", None).await;
        assert_eq!(pending["total"], 0);
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let app = test_app();
        send(&app, "POST", "/api/v1/pools", Some(pool_body("p1"))).await;
        let (status, body) = send(&app, "POST", "/api/v1/pools", Some(pool_body("p1"))).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "already_exists");
    }

    #[tokio::test]
    async fn test_unknown_resources_are_not_found() {
        let app = test_app();
        for uri in ["/api/v1/vips/nope", "/api/v1/pools/nope", "/api/v1/members/nope"] {
            let (status, body) = send(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["error"], "not_found");
        }

        let (status, _) = send(&app, "PUT", "/api/v1/pools/nope", Some(pool_body("nope"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "DELETE", "/api/v1/members/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(app.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_pool() {
        let app = test_app();
        send(&app, "POST", "/api/v1/pools", Some(pool_body("p1"))).await;

        let mut changed = pool_body("ignored");
        changed["lb_method"] = json!("LEAST_CONNECTIONS");
        let (status, body) = send(&app, "PUT", "/api/v1/pools/p1", Some(changed)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ACTIVE");
        assert_eq!(body["entity"]["id"], "p1");
        assert_eq!(body["entity"]["lb_method"], "LEAST_CONNECTIONS");

        let updates = app.remote.calls_for(Op::Update);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].path, "v2.0/lb/pools/p1");
    }

    #[tokio::test]
    async fn test_delete_member() {
        let app = test_app();
        send(&app, "POST", "/api/v1/members", Some(member_body("m1"))).await;

        let (status, _) = send(&app, "DELETE", "/api/v1/members/m1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "GET", "/api/v1/members/m1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_record_in_error() {
        let app = test_app();
        send(&app, "POST", "/api/v1/members", Some(member_body("m1"))).await;
        app.remote
            .fail(Op::Remove, &paths::resource_path(ResourceKind::Member, "m1"));

        let (status, body) = send(&app, "DELETE", "/api/v1/members/m1", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ERROR");
        assert!(app.store.get(ResourceKind::Member, "m1").await.is_some());
    }

    #[tokio::test]
    async fn test_list_pools_filters() {
        let app = test_app();
        send(&app, "POST", "/api/v1/pools", Some(pool_body("p1"))).await;
        let mut other = pool_body("p2");
        other["tenant_id"] = json!("t2");
        send(&app, "POST", "/api/v1/pools", Some(other)).await;

        let (_, all) = send(&app, "GET", "/api/v1/pools", None).await;
        assert_eq!(all["total"], 2);

        let (status, filtered) =
            send(&app, "GET", "/api/v1/pools?tenant_id=t1&subnet_id=s1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(filtered["total"], 1);
        assert_eq!(filtered["items"][0]["id"], "p1");

        let (_, by_tenant) = send(&app, "GET", "/api/v1/pools?tenant_id=t2", None).await;
        assert_eq!(by_tenant["items"][0]["id"], "p2");
    }

    #[tokio::test]
    async fn test_pool_stats() {
        let app = test_app();
        send(&app, "POST", "/api/v1/pools", Some(pool_body("p1"))).await;

        let (status, body) = send(&app, "GET", "/api/v1/pools/p1/stats", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "stats_unavailable");

        app.remote.respond(
            &paths::pool_stats_path("p1"),
            json!({ "stats": { "bytes_in": 10, "active_connections": 2 } }),
        );
        let (status, body) = send(&app, "GET", "/api/v1/pools/p1/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bytes_in"], 10);
    }

    #[tokio::test]
    async fn test_health_monitor_lifecycle() {
        let app = test_app();
        send(&app, "POST", "/api/v1/pools", Some(pool_body("p1"))).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/pools/p1/healthmonitors",
            Some(monitor_body("hm1")),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "ACTIVE");
        assert_eq!(body["pool_id"], "p1");

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/pools/p1/healthmonitors",
            Some(monitor_body("hm1")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let mut changed = monitor_body("hm1");
        changed["delay"] = json!(10);
        let (status, _) = send(
            &app,
            "PUT",
            "/api/v1/pools/p1/healthmonitors/hm1",
            Some(changed),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            app.remote.calls_for(Op::Update)[0].path,
            "v2.0/lb/healthmonitors/hm1"
        );

        let (status, _) = send(&app, "DELETE", "/api/v1/pools/p1/healthmonitors/hm1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(app.store.get_association("hm1", "p1").await.is_none());
        assert_eq!(
            app.remote.calls_for(Op::Remove)[0].path,
            "v2.0/lb/pools/p1/healthmonitors/hm1"
        );
    }

    #[tokio::test]
    async fn test_health_monitor_requires_pool() {
        let app = test_app();
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/pools/missing/healthmonitors",
            Some(monitor_body("hm1")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send(&app, "POST", "/api/v1/pools", Some(pool_body("p1"))).await;
        let (status, _) = send(&app, "DELETE", "/api/v1/pools/p1/healthmonitors/hm1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = test_app();
        send(&app, "POST", "/api/v1/pools", Some(pool_body("p1"))).await;

        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("ncc_remote_calls_total"));
    }
}
