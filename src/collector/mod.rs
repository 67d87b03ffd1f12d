//! Periodic status collection from the Control Center
//!
//! Every tick runs the VIP convergence pass and, when status collection is
//! enabled, the member status sweep. Each VIP and each member is handled on
//! its own: a failure on one never stops the others.

mod members;
mod vip;


use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::StatusCollection;
use crate::driver::PendingVips;
use crate::ncc::RemoteClient;
use crate::store::StatusStore;

pub use members::{MemberStatusEntry, SweepReport};
pub use vip::ConvergenceReport;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Time between two cycles
    pub interval: Duration,
    pub status_collection: StatusCollection,
    /// Upper bound on member status pages per sweep; `None` is unbounded.
    /// An unbounded sweep still stops when the collector is shut down.
    pub max_pages: Option<u32>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            status_collection: StatusCollection::default(),
            max_pages: None,
        }
    }
}

/// Outcome of one collector cycle
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub vips: ConvergenceReport,
    /// `None` when status collection is disabled
    pub members: Option<SweepReport>,
}

pub struct StatusCollector {
    client: Arc<dyn RemoteClient>,
    store: Arc<dyn StatusStore>,
    pending: PendingVips,
    config: CollectorConfig,
}

impl StatusCollector {
    pub fn new(
        client: Arc<dyn RemoteClient>,
        store: Arc<dyn StatusStore>,
        pending: PendingVips,
        config: CollectorConfig,
    ) -> Self {
        Self {
            client,
            store,
            pending,
            config,
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Run both passes once
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        debug!("periodic task interval: {:?}", self.config.interval);

        let vips = self.refresh_vip_status().await;
        let members = if self.config.status_collection.enabled {
            Some(self.refresh_all_members_status().await)
        } else {
            None
        };

        crate::metrics::observe_cycle_duration_seconds(started.elapsed().as_secs_f64());
        CycleReport { vips, members }
    }

    /// Run cycles on the configured interval until `shutdown` turns `true`
    /// or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting status collector (interval {:?}, member status collection {})",
            self.config.interval,
            if self.config.status_collection.enabled {
                "enabled"
            } else {
                "disabled"
            }
        );

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.wait_for(|stop| *stop) => break,
            }

            // a cycle stuck on a slow or endlessly paginating Control Center
            // must not hold up shutdown
            tokio::select! {
                report = self.run_cycle() => {
                    debug!("collector cycle finished: {:?}", report);
                }
                _ = shutdown.wait_for(|stop| *stop) => {
                    info!("Status collector cycle interrupted by shutdown");
                    break;
                }
            }
        }

        info!("Status collector stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
