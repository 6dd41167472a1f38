//! Latest-snapshot store
//!
//! The collector owns the only [`SnapshotStore`]; everyone else holds a
//! [`SnapshotReader`]. A snapshot and the namespace list derived from the
//! same cycle are installed together and are never mutated afterwards.
//! A failed cycle publishes its error next to the snapshot it left in place;
//! the next install clears it.

use crate::models::ClusterSnapshot;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default)]
struct Published {
    snapshot: Option<Arc<ClusterSnapshot>>,
    namespaces: Arc<[String]>,
    failure: Option<Arc<str>>,
}

/// Write side of the store
#[derive(Debug)]
pub struct SnapshotStore {
    tx: watch::Sender<Published>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Published::default());
        Self { tx }
    }

    /// Replace the published snapshot and namespace list atomically
    pub(crate) fn install(
        &self,
        snapshot: ClusterSnapshot,
        namespaces: Vec<String>,
    ) -> Arc<ClusterSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.tx.send_replace(Published {
            snapshot: Some(Arc::clone(&snapshot)),
            namespaces: namespaces.into(),
            failure: None,
        });
        snapshot
    }

    /// Publish why the latest cycle produced nothing; the snapshot stays
    pub(crate) fn record_failure(&self, message: impl Into<Arc<str>>) {
        let message = message.into();
        self.tx.send_modify(|published| published.failure = Some(message));
    }

    pub fn latest(&self) -> Option<Arc<ClusterSnapshot>> {
        self.tx.borrow().snapshot.clone()
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.tx.borrow().namespaces.to_vec()
    }

    pub fn last_failure(&self) -> Option<Arc<str>> {
        self.tx.borrow().failure.clone()
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side of the store; cheap to clone
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Published>,
}

impl SnapshotReader {
    /// Most recent successful snapshot, if any cycle has succeeded yet
    pub fn latest(&self) -> Option<Arc<ClusterSnapshot>> {
        self.rx.borrow().snapshot.clone()
    }

    /// Sorted distinct namespaces of the most recent successful snapshot
    pub fn namespaces(&self) -> Vec<String> {
        self.rx.borrow().namespaces.to_vec()
    }

    /// Error of the latest cycle if it failed after the last install
    pub fn last_failure(&self) -> Option<Arc<str>> {
        self.rx.borrow().failure.clone()
    }

    /// Wait for the next install or failure; false once the store is gone
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
