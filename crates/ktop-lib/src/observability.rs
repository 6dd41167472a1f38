//! Observability for the collection pipeline
//!
//! Provides:
//! - Prometheus metrics (cycle latency, cycle outcomes, entity counts)
//! - Structured logging of collector lifecycle events with tracing

use crate::error::{CollectError, CollectWarning};
use prometheus::{register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, info, warn};

/// Histogram buckets for cycle latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance; `None` if registration failed
static GLOBAL_METRICS: OnceLock<Option<CollectorMetricsInner>> = OnceLock::new();

struct CollectorMetricsInner {
    cycle_latency_seconds: Histogram,
    cycles_succeeded: IntCounter,
    cycles_failed: IntCounter,
    usage_degraded: IntCounter,
    nodes: IntGauge,
    pods: IntGauge,
}

impl CollectorMetricsInner {
    fn register() -> prometheus::Result<Self> {
        Ok(Self {
            cycle_latency_seconds: register_histogram!(
                "ktop_collection_latency_seconds",
                "Wall time of one collection cycle",
                LATENCY_BUCKETS.to_vec()
            )?,
            cycles_succeeded: register_int_counter!(
                "ktop_collection_cycles_total",
                "Collection cycles that produced a snapshot"
            )?,
            cycles_failed: register_int_counter!(
                "ktop_collection_failures_total",
                "Collection cycles discarded by a fatal read failure"
            )?,
            usage_degraded: register_int_counter!(
                "ktop_usage_degraded_total",
                "Snapshots published without complete usage samples"
            )?,
            nodes: register_int_gauge!("ktop_nodes", "Nodes in the latest snapshot")?,
            pods: register_int_gauge!("ktop_pods", "Pods in the latest snapshot")?,
        })
    }
}

/// Collector metrics for Prometheus exposition
///
/// Lightweight handle to the process-wide metrics; clones share them.
#[derive(Clone)]
pub struct CollectorMetrics {
    _private: (),
}

impl Default for CollectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectorMetrics {
    /// Create a handle, registering the metrics on first call
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(|| match CollectorMetricsInner::register() {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(error = %e, "Failed to register collector metrics; metrics disabled");
                None
            }
        });
        Self { _private: () }
    }

    fn inner(&self) -> Option<&CollectorMetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    /// Record a cycle that produced a snapshot
    pub fn record_success(&self, elapsed: Duration, nodes: usize, pods: usize, degraded: bool) {
        if let Some(m) = self.inner() {
            m.cycle_latency_seconds.observe(elapsed.as_secs_f64());
            m.cycles_succeeded.inc();
            if degraded {
                m.usage_degraded.inc();
            }
            m.nodes.set(i64::try_from(nodes).unwrap_or(i64::MAX));
            m.pods.set(i64::try_from(pods).unwrap_or(i64::MAX));
        }
    }

    /// Record a discarded cycle
    pub fn record_failure(&self, elapsed: Duration) {
        if let Some(m) = self.inner() {
            m.cycle_latency_seconds.observe(elapsed.as_secs_f64());
            m.cycles_failed.inc();
        }
    }
}

/// Render every registered metric in the Prometheus text format
pub fn render_metrics() -> prometheus::Result<Vec<u8>> {
    use prometheus::{Encoder, TextEncoder};

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(buffer)
}

/// Structured logger for collector events
#[derive(Clone)]
pub struct StructuredLogger {
    cluster: String,
}

impl StructuredLogger {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    /// Log collector startup
    pub fn log_startup(&self, version: &str, interval: Duration, timeout: Duration) {
        info!(
            event = "collector_started",
            cluster = %self.cluster,
            version = %version,
            interval_ms = interval.as_millis() as u64,
            timeout_ms = timeout.as_millis() as u64,
            "Collector started"
        );
    }

    /// Log a discarded cycle
    pub fn log_collection_failed(&self, err: &CollectError, elapsed: Duration) {
        error!(
            event = "collection_failed",
            cluster = %self.cluster,
            kind = err.kind(),
            error = %err,
            elapsed_ms = elapsed.as_millis() as u64,
            "Collection cycle failed, keeping previous snapshot"
        );
    }

    /// Log a snapshot published without complete usage
    pub fn log_usage_degraded(&self, warning: &CollectWarning) {
        warn!(
            event = "usage_degraded",
            cluster = %self.cluster,
            warning = %warning,
            "Usage samples unavailable, publishing zeroed usage"
        );
    }

    /// Log shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "shutdown",
            cluster = %self.cluster,
            reason = %reason,
            "ktop shutting down"
        );
    }
}
