//! Prometheus metrics for the NetScaler driver
//!
//! # Exported metrics
//! The `/metrics` endpoint (when built with `--features metrics`) exports:
//! - `ncc_remote_calls_total` (counter): Control Center calls labeled by operation and outcome.
//! - `ncc_status_writes_total` (counter): local status writes labeled by kind and status.
//! - `ncc_pending_vips` (gauge): VIPs awaiting confirmation from the Control Center.
//! - `ncc_collector_cycle_duration_seconds` (histogram): duration of one collector cycle.
//! - `ncc_member_status_pages_total` (counter): member status pages fetched.
//!
//! Without the feature every recording helper is a no-op.

#[cfg(feature = "metrics")]
mod registry {
    use std::sync::atomic::{AtomicI64, AtomicU64};

    use once_cell::sync::Lazy;
    use prometheus_client::encoding::EncodeLabelSet;
    use prometheus_client::metrics::counter::Counter;
    use prometheus_client::metrics::family::Family;
    use prometheus_client::metrics::gauge::Gauge;
    use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
    use prometheus_client::registry::Registry;

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    pub struct RemoteCallLabels {
        /// e.g. "create_vip", "retrieve_member_status"
        pub operation: String,
        /// "success" or "failure"
        pub outcome: String,
    }

    #[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
    pub struct StatusWriteLabels {
        pub kind: String,
        pub status: String,
    }

    pub static REMOTE_CALLS_TOTAL: Lazy<Family<RemoteCallLabels, Counter<u64, AtomicU64>>> =
        Lazy::new(Family::default);

    pub static STATUS_WRITES_TOTAL: Lazy<Family<StatusWriteLabels, Counter<u64, AtomicU64>>> =
        Lazy::new(Family::default);

    pub static PENDING_VIPS: Lazy<Gauge<i64, AtomicI64>> = Lazy::new(Gauge::default);

    pub static CYCLE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
        // 1ms .. ~32s across 16 buckets.
        Histogram::new(exponential_buckets(0.001, 2.0, 16))
    });

    pub static MEMBER_STATUS_PAGES_TOTAL: Lazy<Counter<u64, AtomicU64>> =
        Lazy::new(Counter::default);

    /// Global metrics registry
    pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
        let mut registry = Registry::default();

        registry.register(
            "ncc_remote_calls",
            "Total number of Control Center calls",
            REMOTE_CALLS_TOTAL.clone(),
        );
        registry.register(
            "ncc_status_writes",
            "Total number of local status writes",
            STATUS_WRITES_TOTAL.clone(),
        );
        registry.register(
            "ncc_pending_vips",
            "VIPs awaiting confirmation from the Control Center",
            PENDING_VIPS.clone(),
        );
        registry.register(
            "ncc_collector_cycle_duration_seconds",
            "Duration of status collector cycles in seconds",
            CYCLE_DURATION_SECONDS.clone(),
        );
        registry.register(
            "ncc_member_status_pages",
            "Total number of member status pages fetched",
            MEMBER_STATUS_PAGES_TOTAL.clone(),
        );

        registry
    });
}

#[cfg(feature = "metrics")]
pub use registry::REGISTRY;

/// Render the registry in the Prometheus text format
#[cfg(feature = "metrics")]
pub fn encode_text() -> Result<String, std::fmt::Error> {
    let mut buffer = String::new();
    prometheus_client::encoding::text::encode(&mut buffer, &REGISTRY)?;
    Ok(buffer)
}

pub fn inc_remote_call(operation: &str, success: bool) {
    #[cfg(feature = "metrics")]
    registry::REMOTE_CALLS_TOTAL
        .get_or_create(&registry::RemoteCallLabels {
            operation: operation.to_string(),
            outcome: if success { "success" } else { "failure" }.to_string(),
        })
        .inc();
    #[cfg(not(feature = "metrics"))]
    let _ = (operation, success);
}

pub fn inc_status_write(kind: &str, status: &str) {
    #[cfg(feature = "metrics")]
    registry::STATUS_WRITES_TOTAL
        .get_or_create(&registry::StatusWriteLabels {
            kind: kind.to_string(),
            status: status.to_string(),
        })
        .inc();
    #[cfg(not(feature = "metrics"))]
    let _ = (kind, status);
}

pub fn set_pending_vips(count: usize) {
    #[cfg(feature = "metrics")]
    registry::PENDING_VIPS.set(i64::try_from(count).unwrap_or(i64::MAX));
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

pub fn observe_cycle_duration_seconds(seconds: f64) {
    #[cfg(feature = "metrics")]
    registry::CYCLE_DURATION_SECONDS.observe(seconds);
    #[cfg(not(feature = "metrics"))]
    let _ = seconds;
}

pub fn inc_member_status_page() {
    #[cfg(feature = "metrics")]
    registry::MEMBER_STATUS_PAGES_TOTAL.inc();
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;

    #[test]
    fn test_registry_registration() {
        inc_remote_call("create_vip", true);
        inc_status_write("vip", "PENDING_CREATE");
        set_pending_vips(3);
        observe_cycle_duration_seconds(0.25);
        inc_member_status_page();

        let text = encode_text().unwrap();
        assert!(text.contains("ncc_remote_calls_total"));
        assert!(text.contains("ncc_status_writes_total"));
        assert!(text.contains("ncc_pending_vips"));
        assert!(text.contains("ncc_collector_cycle_duration_seconds"));
        assert!(text.contains("ncc_member_status_pages_total"));
    }
}
