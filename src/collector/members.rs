//! Member status sweep
//!
//! The Control Center publishes member health as a global, paginated feed.
//! A page holding fewer groups than the page size is the last one.

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::StatusCollector;
use crate::model::{ResourceKind, Status};
use crate::ncc::error::Result;
use crate::ncc::paths;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pages fetched
    pub pages: u32,
    pub members_updated: usize,
    pub failed_writes: usize,
    /// True when the sweep ended on a short page
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MemberStatusEntry {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub status_description: String,
}

#[derive(Deserialize)]
struct StatusGroup {
    #[serde(default)]
    memberstatus: Vec<MemberStatusEntry>,
}

#[derive(Deserialize)]
struct MemberStatusPage {
    statuses: Vec<StatusGroup>,
}

impl StatusCollector {
    async fn fetch_member_status_page(&self, page: u32, page_size: u32) -> Result<Vec<StatusGroup>> {
        let path = paths::member_status_page_path(page, page_size);
        let response = self
            .client
            .retrieve_resource(paths::GLOBAL_TENANT, &path)
            .await?;
        debug!("member status page {}: {}", page, response.body);

        let parsed: MemberStatusPage = serde_json::from_str(&response.body)?;
        Ok(parsed.statuses)
    }

    /// Write the Control Center's status for every member, page by page.
    ///
    /// Statuses overwrite whatever is stored locally. A page that cannot be
    /// fetched ends the sweep for this cycle, since the next page number is
    /// then unknown.
    #[instrument(skip(self))]
    pub async fn refresh_all_members_status(&self) -> SweepReport {
        let page_size = self.config.status_collection.page_size.max(1);
        let mut report = SweepReport::default();
        let mut page: u32 = 1;

        loop {
            if let Some(max_pages) = self.config.max_pages {
                if report.pages >= max_pages {
                    warn!(
                        "Member status sweep stopped after {} pages without reaching the last page",
                        report.pages
                    );
                    return report;
                }
            }

            let groups = match self.fetch_member_status_page(page, page_size).await {
                Ok(groups) => groups,
                Err(e) => {
                    warn!("Failed to fetch member status page {}: {}", page, e);
                    crate::metrics::inc_remote_call("retrieve_member_status", false);
                    return report;
                }
            };
            crate::metrics::inc_remote_call("retrieve_member_status", true);
            crate::metrics::inc_member_status_page();
            report.pages += 1;

            for member in groups.iter().flat_map(|g| g.memberstatus.iter()) {
                match self
                    .store
                    .update_status(
                        ResourceKind::Member,
                        &member.id,
                        Status::from(member.status.as_str()),
                        Some(member.status_description.clone()),
                    )
                    .await
                {
                    Ok(()) => {
                        crate::metrics::inc_status_write("member", &member.status);
                        report.members_updated += 1;
                    }
                    Err(e) => {
                        debug!("Failed to write status of member {}: {}", member.id, e);
                        report.failed_writes += 1;
                    }
                }
            }

            if groups.len() < page_size as usize {
                report.completed = true;
                return report;
            }
            page = page.saturating_add(1);
        }
    }
}
