//! VIPs submitted for creation and not yet confirmed by the Control Center

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Shared handle to the pending-VIP set.
///
/// Clones share the same set. The set lives for the process only; after a
/// restart the store's `PENDING_CREATE` VIPs are the source of truth.
#[derive(Clone, Debug, Default)]
pub struct PendingVips {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl PendingVips {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, vip_id: &str) -> bool {
        let inserted = self.inner.write().await.insert(vip_id.to_string());
        crate::metrics::set_pending_vips(self.len().await);
        inserted
    }

    /// Removing an id that is not tracked is a no-op
    pub async fn remove(&self, vip_id: &str) -> bool {
        let removed = self.inner.write().await.remove(vip_id);
        crate::metrics::set_pending_vips(self.len().await);
        removed
    }

    pub async fn contains(&self, vip_id: &str) -> bool {
        self.inner.read().await.contains(vip_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Sorted copy of the tracked ids
    pub async fn snapshot(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.read().await.iter().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_remove() {
        let pending = PendingVips::new();
        assert!(pending.insert("v1").await);
        assert!(!pending.insert("v1").await);
        assert!(pending.contains("v1").await);
        assert_eq!(pending.len().await, 1);

        assert!(pending.remove("v1").await);
        assert!(pending.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_untracked_is_noop() {
        let pending = PendingVips::new();
        assert!(!pending.remove("never-added").await);
        assert!(pending.is_empty().await);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let pending = PendingVips::new();
        let handle = pending.clone();
        pending.insert("v2").await;
        pending.insert("v1").await;
        assert_eq!(handle.snapshot().await, vec!["v1".to_string(), "v2".to_string()]);
    }
}
