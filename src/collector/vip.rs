//! VIP convergence pass

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::StatusCollector;
use crate::model::{ResourceKind, Status};
use crate::ncc::error::Result;
use crate::ncc::paths;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConvergenceReport {
    /// VIPs found in `PENDING_CREATE` locally
    pub checked: usize,
    /// VIPs whose remote status was written
    pub converged: usize,
    /// VIPs the Control Center still reports as `PENDING_CREATE`
    pub still_pending: usize,
    /// VIPs that could not be retrieved this cycle
    pub skipped: usize,
    pub failed_writes: usize,
    /// Tracked ids dropped because the VIP is no longer pending locally
    pub released: usize,
}

#[derive(Deserialize)]
struct VipEnvelope {
    vip: RemoteVip,
}

#[derive(Deserialize)]
struct RemoteVip {
    status: String,
}

impl StatusCollector {
    async fn fetch_vip_status(&self, vip_id: &str) -> Result<Status> {
        let response = self
            .client
            .retrieve_resource(
                paths::GLOBAL_TENANT,
                &paths::resource_path(ResourceKind::Vip, vip_id),
            )
            .await?;
        debug!("vip {} retrieved: {}", vip_id, response.body);

        let envelope: VipEnvelope = serde_json::from_str(&response.body)?;
        Ok(Status::from(envelope.vip.status))
    }

    /// Poll every locally pending VIP and write back the remote status once
    /// it has left `PENDING_CREATE`.
    ///
    /// A VIP that cannot be retrieved is left alone until the next cycle; the
    /// Control Center may simply not have provisioned it yet. Tracked ids
    /// whose VIP was deleted or left `PENDING_CREATE` locally are released.
    #[instrument(skip(self))]
    pub async fn refresh_vip_status(&self) -> ConvergenceReport {
        let mut report = ConvergenceReport::default();

        // taken before listing so ids tracked after the listing are kept
        let tracked = self.pending.snapshot().await;

        let pending = match self
            .store
            .list_vips_with_status(&Status::PendingCreate)
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Failed to list pending VIPs: {}", e);
                return report;
            }
        };

        let listed: HashSet<&str> = pending.iter().map(String::as_str).collect();
        for vip_id in tracked.iter().filter(|id| !listed.contains(id.as_str())) {
            if self.pending.remove(vip_id).await {
                debug!("vip {} is no longer pending locally, releasing it", vip_id);
                report.released += 1;
            }
        }

        for vip_id in pending {
            report.checked += 1;

            let remote_status = match self.fetch_vip_status(&vip_id).await {
                Ok(status) => status,
                Err(e) => {
                    debug!("vip {} not available on Control Center yet: {}", vip_id, e);
                    crate::metrics::inc_remote_call("retrieve_vip", false);
                    report.skipped += 1;
                    continue;
                }
            };
            crate::metrics::inc_remote_call("retrieve_vip", true);

            if remote_status.is_pending_create() {
                report.still_pending += 1;
                continue;
            }

            match self
                .store
                .update_status(ResourceKind::Vip, &vip_id, remote_status.clone(), None)
                .await
            {
                Ok(()) => {
                    self.pending.remove(&vip_id).await;
                    crate::metrics::inc_status_write("vip", remote_status.as_str());
                    info!("vip {} converged to {}", vip_id, remote_status);
                    report.converged += 1;
                }
                Err(e) => {
                    warn!("Failed to write status of vip {}: {}", vip_id, e);
                    report.failed_writes += 1;
                }
            }
        }

        report
    }
}
