//! Upstream API health as seen by the collector
//!
//! Each cycle reports on the two APIs it reads from: the core API serving
//! node and pod descriptors, and `metrics.k8s.io` serving usage samples.
//! A fatal cycle marks the cluster API unhealthy, while a failed usage read
//! only degrades the metrics API. `/healthz` serves the result.

use crate::error::{CollectError, CollectWarning};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Upstream API a cycle depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Node and pod descriptor reads
    ClusterApi,
    /// metrics.k8s.io usage reads
    MetricsApi,
}

/// Ordered from best to worst so the overall status is the maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Usage data is missing but snapshots are still produced
    Degraded,
    /// No snapshot can be produced
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        *self != ComponentStatus::Unhealthy
    }
}

/// Last known state of one upstream API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Label of the most recent failure, e.g. `deadline_exceeded`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<String>,
    /// Failed cycles since the last success
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success: Option<DateTime<Utc>>,
    pub last_check: DateTime<Utc>,
}

impl ComponentHealth {
    /// Registered, no cycle has reported yet
    fn pending(now: DateTime<Utc>) -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            failure_kind: None,
            consecutive_failures: 0,
            last_success: None,
            last_check: now,
        }
    }

    fn succeed(&mut self, now: DateTime<Utc>) {
        self.status = ComponentStatus::Healthy;
        self.message = None;
        self.failure_kind = None;
        self.consecutive_failures = 0;
        self.last_success = Some(now);
        self.last_check = now;
    }

    fn fail(&mut self, status: ComponentStatus, kind: &str, message: String, now: DateTime<Utc>) {
        self.status = status;
        self.message = Some(message);
        self.failure_kind = Some(kind.to_string());
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_check = now;
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<Component, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status among components wins
    pub fn compute_status(components: &BTreeMap<Component, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|health| health.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Shared view of upstream API health, written by the collector
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<BTreeMap<Component, ComponentHealth>>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// List a component on `/healthz` before its first report
    pub async fn register(&self, component: Component) {
        let mut components = self.components.write().await;
        components
            .entry(component)
            .or_insert_with(|| ComponentHealth::pending(Utc::now()));
    }

    /// A snapshot was installed, possibly without usage data
    pub async fn record_cycle_success(&self, warning: Option<&CollectWarning>) {
        let now = Utc::now();
        let mut components = self.components.write().await;

        entry(&mut components, Component::ClusterApi, now).succeed(now);
        let metrics = entry(&mut components, Component::MetricsApi, now);
        match warning {
            Some(w) => metrics.fail(ComponentStatus::Degraded, w.kind(), w.to_string(), now),
            None => metrics.succeed(now),
        }
    }

    /// The cycle was discarded; usage reads are not judged
    pub async fn record_cycle_failure(&self, err: &CollectError) {
        let now = Utc::now();
        let mut components = self.components.write().await;
        entry(&mut components, Component::ClusterApi, now).fail(
            ComponentStatus::Unhealthy,
            err.kind(),
            err.to_string(),
            now,
        );
    }

    /// Current health of every known component
    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }
}

fn entry(
    components: &mut BTreeMap<Component, ComponentHealth>,
    component: Component,
    now: DateTime<Utc>,
) -> &mut ComponentHealth {
    components
        .entry(component)
        .or_insert_with(|| ComponentHealth::pending(now))
}
