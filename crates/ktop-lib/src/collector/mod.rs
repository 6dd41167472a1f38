//! Cluster state collection
//!
//! A [`Collector`] runs one cycle at a time: it issues the four source
//! reads concurrently under a shared deadline, merges descriptors with
//! usage samples and installs the result in its [`SnapshotStore`].
//!
//! Descriptor reads are fatal: if either fails the cycle is discarded and
//! the previous snapshot stays published. Usage reads are best effort: a
//! failure zeroes the affected usage and is reported on the snapshot.

mod r#loop;
pub mod merge;
mod store;

#[cfg(test)]
pub(crate) mod mock;

pub use merge::Partial;
pub use r#loop::{
    PollingConfig, PollingLoop, PollingLoopBuilder, PollingStats, RefreshHandle, MAX_INTERVAL,
    MIN_INTERVAL,
};
pub use store::{SnapshotReader, SnapshotStore};

use crate::error::{CollectError, CollectWarning};
use crate::health::HealthRegistry;
use crate::models::{ClusterIdentity, ClusterSnapshot};
use crate::observability::{CollectorMetrics, StructuredLogger};
use crate::source::ResourceStateSource;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

/// Why a single read produced no value
#[derive(Debug)]
enum ReadFailure {
    Failed(anyhow::Error),
    TimedOut,
}

async fn bounded<T>(
    deadline: Instant,
    read: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, ReadFailure> {
    match timeout_at(deadline, read).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ReadFailure::Failed(e)),
        Err(_) => Err(ReadFailure::TimedOut),
    }
}

fn required<T>(
    result: Result<T, ReadFailure>,
    timeout: Duration,
    read: &'static str,
    wrap: fn(anyhow::Error) -> CollectError,
) -> Result<T, CollectError> {
    result.map_err(|failure| match failure {
        ReadFailure::Failed(e) => wrap(e),
        ReadFailure::TimedOut => CollectError::DeadlineExceeded { timeout, read },
    })
}

fn best_effort<T>(
    result: Result<T, ReadFailure>,
    wrap: fn(String) -> CollectWarning,
) -> Partial<Option<T>> {
    match result {
        Ok(value) => Partial::complete(Some(value)),
        Err(ReadFailure::Failed(e)) => Partial::degraded(None, wrap(format!("{e:#}"))),
        Err(ReadFailure::TimedOut) => Partial::degraded(None, wrap("deadline exceeded".to_string())),
    }
}

/// Produces cluster snapshots from a [`ResourceStateSource`]
pub struct Collector {
    source: Arc<dyn ResourceStateSource>,
    cluster: ClusterIdentity,
    store: SnapshotStore,
    metrics: CollectorMetrics,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
}

impl Collector {
    pub fn new(source: Arc<dyn ResourceStateSource>, cluster: ClusterIdentity) -> Self {
        let logger = StructuredLogger::new(&cluster.name);
        Self {
            source,
            cluster,
            store: SnapshotStore::new(),
            metrics: CollectorMetrics::new(),
            logger,
            health: None,
        }
    }

    /// Report upstream API health into `registry` after every cycle
    pub fn with_health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    pub fn cluster(&self) -> &ClusterIdentity {
        &self.cluster
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Most recent successful snapshot
    pub fn last_snapshot(&self) -> Option<Arc<ClusterSnapshot>> {
        self.store.latest()
    }

    /// Namespaces of the most recent successful snapshot, sorted
    pub fn namespaces(&self) -> Vec<String> {
        self.store.namespaces()
    }

    /// Error of the latest cycle, cleared by the next success
    pub fn last_failure(&self) -> Option<Arc<str>> {
        self.store.last_failure()
    }

    pub fn reader(&self) -> SnapshotReader {
        self.store.reader()
    }

    /// Run one collection cycle bounded by `timeout`
    ///
    /// On success the new snapshot is installed and returned. On error the
    /// snapshot stays in place and the error is published beside it. The
    /// first descriptor error to arrive is the one reported.
    pub async fn collect(&self, timeout: Duration) -> Result<Arc<ClusterSnapshot>, CollectError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let timestamp = Utc::now();

        // Usage reads never fail the cycle, so the first descriptor error
        // ends it without waiting on them.
        let descriptors = tokio::try_join!(
            async {
                let nodes = bounded(deadline, self.source.list_node_descriptors()).await;
                required(nodes, timeout, "nodes", CollectError::NodeDescriptors)
            },
            async {
                let pods = bounded(deadline, self.source.list_workload_descriptors()).await;
                required(pods, timeout, "pods", CollectError::WorkloadDescriptors)
            },
            async {
                Ok::<_, CollectError>(tokio::join!(
                    bounded(deadline, self.source.list_node_usage()),
                    bounded(deadline, self.source.list_workload_usage()),
                ))
            },
        );
        let (node_descriptors, workload_descriptors, (node_usage, pod_usage)) = match descriptors {
            Ok(reads) => reads,
            Err(e) => {
                self.fail(&e, started.elapsed()).await;
                return Err(e);
            }
        };

        let node_usage = best_effort(node_usage, CollectWarning::NodeUsage);
        let pod_usage = best_effort(pod_usage, CollectWarning::WorkloadUsage);
        let warning = merge::first_warning(node_usage.warning, pod_usage.warning);

        let pods = merge::merge_pods(workload_descriptors, pod_usage.value.as_ref());
        let nodes = merge::merge_nodes(node_descriptors, node_usage.value.as_ref(), &pods);
        let namespaces = merge::distinct_namespaces(&pods);

        let snapshot = ClusterSnapshot::new(timestamp, self.cluster.clone(), nodes, pods, warning);
        let snapshot = self.store.install(snapshot, namespaces);

        let elapsed = started.elapsed();
        self.metrics.record_success(
            elapsed,
            snapshot.nodes.len(),
            snapshot.pods.len(),
            snapshot.error.is_some(),
        );
        if let Some(warning) = &snapshot.error {
            self.logger.log_usage_degraded(warning);
        }
        if let Some(health) = &self.health {
            health.record_cycle_success(snapshot.error.as_ref()).await;
        }

        debug!(
            nodes = snapshot.nodes.len(),
            pods = snapshot.pods.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Snapshot installed"
        );

        Ok(snapshot)
    }

    async fn fail(&self, err: &CollectError, elapsed: Duration) {
        self.store.record_failure(err.to_string());
        self.metrics.record_failure(elapsed);
        self.logger.log_collection_failed(err, elapsed);
        if let Some(health) = &self.health {
            health.record_cycle_failure(err).await;
        }
    }
}
