//! Resource-state sources
//!
//! The collector depends only on [`ResourceStateSource`]: four independent
//! reads returning descriptors (slow-changing resource descriptions) and
//! usage samples (point-in-time consumption). [`KubeSource`] implements it
//! against a live cluster.

mod kubernetes;
mod metrics_api;
pub mod quantity;

pub use kubernetes::{ConnectOptions, KubeSource};
pub use metrics_api::{NodeMetrics, PodMetrics};

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Extended resource name used for accelerator capacity
pub const ACCELERATOR_RESOURCE: &str = "nvidia.com/gpu";

/// Node label carrying accelerator memory in MiB
pub const ACCELERATOR_MEMORY_LABEL: &str = "nvidia.com/gpu.memory";

/// Resource amounts in base units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceAmounts {
    pub cpu_milli: i64,
    pub memory_bytes: i64,
    pub ephemeral_storage_bytes: Option<i64>,
    pub accelerator_count: Option<i64>,
}

/// One upstream node condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionReport {
    /// Condition type, e.g. `Ready` or `MemoryPressure`
    pub kind: String,
    /// True only when the upstream status is `True`
    pub active: bool,
}

impl ConditionReport {
    pub fn new(kind: impl Into<String>, active: bool) -> Self {
        Self {
            kind: kind.into(),
            active,
        }
    }
}

/// Static description of a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub name: String,
    pub capacity: ResourceAmounts,
    pub allocatable: ResourceAmounts,
    pub conditions: Vec<ConditionReport>,
    pub labels: BTreeMap<String, String>,
}

/// Static description of a workload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadDescriptor {
    pub namespace: String,
    pub name: String,
    pub node_name: String,
    /// Upstream phase string (`Running`, `Pending`, ...)
    pub phase: String,
    pub container_count: usize,
    pub restart_counts: Vec<i32>,
}

impl WorkloadDescriptor {
    pub fn key(&self) -> WorkloadKey {
        WorkloadKey::new(&self.namespace, &self.name)
    }
}

/// Point-in-time consumption sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageSample {
    pub cpu_milli: i64,
    pub memory_bytes: i64,
}

impl std::ops::AddAssign for UsageSample {
    fn add_assign(&mut self, rhs: Self) {
        self.cpu_milli += rhs.cpu_milli;
        self.memory_bytes += rhs.memory_bytes;
    }
}

/// Composite workload key; displays as `namespace/name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkloadKey {
    pub namespace: String,
    pub name: String,
}

impl WorkloadKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Read-only access to cluster resource state
#[async_trait]
pub trait ResourceStateSource: Send + Sync {
    /// List all node descriptors
    async fn list_node_descriptors(&self) -> Result<Vec<NodeDescriptor>>;

    /// List node usage samples keyed by node name
    async fn list_node_usage(&self) -> Result<HashMap<String, UsageSample>>;

    /// List workload descriptors across all namespaces
    async fn list_workload_descriptors(&self) -> Result<Vec<WorkloadDescriptor>>;

    /// List workload usage samples, already summed per container
    async fn list_workload_usage(&self) -> Result<HashMap<WorkloadKey, UsageSample>>;
}
