//! Core data models for cluster snapshots
//!
//! Field names on the serialized forms are part of the export contract
//! (`ktop --show nodes|pods`) and must not change.

use crate::error::CollectWarning;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Safe percentage: `used / capacity * 100`, or 0 when there is no capacity.
///
/// Not clamped above 100; bursty usage can exceed capacity.
pub fn safe_percent(used: i64, capacity: i64) -> f64 {
    if capacity <= 0 {
        return 0.0;
    }
    let percent = used as f64 / capacity as f64 * 100.0;
    if percent.is_finite() && percent > 0.0 {
        percent
    } else {
        0.0
    }
}

/// Current usage against capacity for one resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceUsage {
    /// Usage in base units (millicores for CPU, bytes for memory and disk)
    pub current: i64,
    pub capacity: i64,
    pub percent: f64,
}

impl ResourceUsage {
    /// Usage with a known capacity and nothing consumed yet
    pub fn with_capacity(capacity: i64) -> Self {
        Self {
            current: 0,
            capacity,
            percent: 0.0,
        }
    }

    /// Record a usage sample and recompute the percentage
    pub fn set_current(&mut self, current: i64) {
        self.current = current;
        self.percent = safe_percent(current, self.capacity);
    }
}

/// Accelerator (GPU) information for a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AcceleratorInfo {
    pub count: u32,
    pub memory_used: i64,
    pub memory_total: i64,
    pub utilization: f64,
}

/// Pressure conditions reported as active on a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeConditions {
    pub memory_pressure: bool,
    pub disk_pressure: bool,
    #[serde(rename = "PIDPressure")]
    pub pid_pressure: bool,
    #[serde(rename = "NetworkUnavail")]
    pub network_unavailable: bool,
}

impl NodeConditions {
    pub fn any(&self) -> bool {
        self.memory_pressure || self.disk_pressure || self.pid_pressure || self.network_unavailable
    }
}

/// Node readiness; declaration order is the sort ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Ready,
    NotReady,
    Unknown,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Ready => "Ready",
            NodeStatus::NotReady => "NotReady",
            NodeStatus::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cluster node merged from its descriptor and usage sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Node {
    pub name: String,
    pub status: NodeStatus,
    #[serde(rename = "CPU")]
    pub cpu: ResourceUsage,
    pub memory: ResourceUsage,
    pub disk: ResourceUsage,
    /// `None` means no accelerator capacity was reported, not zero accelerators in use
    #[serde(rename = "GPU")]
    pub accelerator: Option<AcceleratorInfo>,
    pub pod_count: usize,
    pub conditions: NodeConditions,
    pub labels: BTreeMap<String, String>,
}

/// Pod lifecycle phase; declaration order is the sort ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PodStatus {
    Running,
    Pending,
    Succeeded,
    Failed,
    Unknown,
}

impl PodStatus {
    /// Map an upstream phase string; anything unrecognised is `Unknown`
    pub fn from_phase(phase: &str) -> Self {
        match phase {
            "Running" => PodStatus::Running,
            "Pending" => PodStatus::Pending,
            "Succeeded" => PodStatus::Succeeded,
            "Failed" => PodStatus::Failed,
            _ => PodStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PodStatus::Running => "Running",
            PodStatus::Pending => "Pending",
            PodStatus::Succeeded => "Succeeded",
            PodStatus::Failed => "Failed",
            PodStatus::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for PodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A workload (pod); identified by namespace + name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Pod {
    pub namespace: String,
    pub name: String,
    pub node_name: String,
    pub status: PodStatus,
    /// Millicores summed over containers
    #[serde(rename = "CPU")]
    pub cpu: i64,
    /// Bytes summed over containers
    pub memory: i64,
    pub container_count: usize,
    pub restart_count: i64,
}

/// Identity of the connected cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterIdentity {
    pub name: String,
    pub context: String,
    pub server: String,
    /// Namespace of the active context, if set
    pub namespace: String,
}

/// Cluster-wide aggregates, always summed over the same snapshot's entities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTotals {
    pub cpu_capacity: i64,
    pub cpu_used: i64,
    pub cpu_core_count: i64,
    pub memory_capacity: i64,
    pub memory_used: i64,
    pub disk_capacity: i64,
    pub disk_used: i64,
    pub accelerator_count: u32,
    pub workload_count: usize,
    pub node_count: usize,
    pub ready_node_count: usize,
}

impl ClusterTotals {
    /// Sum the aggregates over one cycle's nodes and pods
    pub fn compute(nodes: &[Node], pods: &[Pod]) -> Self {
        let mut totals = ClusterTotals {
            workload_count: pods.len(),
            node_count: nodes.len(),
            ..Default::default()
        };

        for node in nodes {
            totals.cpu_capacity += node.cpu.capacity;
            totals.cpu_used += node.cpu.current;
            totals.memory_capacity += node.memory.capacity;
            totals.memory_used += node.memory.current;
            totals.disk_capacity += node.disk.capacity;
            totals.disk_used += node.disk.current;
            totals.cpu_core_count += node.cpu.capacity / 1000;

            if let Some(accelerator) = &node.accelerator {
                totals.accelerator_count += accelerator.count;
            }
            if node.status == NodeStatus::Ready {
                totals.ready_node_count += 1;
            }
        }

        totals
    }

    pub fn cpu_percent(&self) -> f64 {
        safe_percent(self.cpu_used, self.cpu_capacity)
    }

    pub fn memory_percent(&self) -> f64 {
        safe_percent(self.memory_used, self.memory_capacity)
    }

    pub fn disk_percent(&self) -> f64 {
        safe_percent(self.disk_used, self.disk_capacity)
    }
}

/// One self-consistent view of the cluster at a single collection time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cluster: ClusterIdentity,
    pub nodes: Vec<Node>,
    pub pods: Vec<Pod>,
    /// First non-fatal failure of the cycle, if any
    pub error: Option<CollectWarning>,
    pub totals: ClusterTotals,
}

impl ClusterSnapshot {
    /// Build a snapshot, deriving totals from the given entities
    pub fn new(
        timestamp: DateTime<Utc>,
        cluster: ClusterIdentity,
        nodes: Vec<Node>,
        pods: Vec<Pod>,
        error: Option<CollectWarning>,
    ) -> Self {
        let totals = ClusterTotals::compute(&nodes, &pods);
        Self {
            timestamp,
            cluster,
            nodes,
            pods,
            error,
            totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, cpu: (i64, i64), status: NodeStatus) -> Node {
        let mut cpu_usage = ResourceUsage::with_capacity(cpu.1);
        cpu_usage.set_current(cpu.0);
        Node {
            name: name.to_string(),
            status,
            cpu: cpu_usage,
            memory: ResourceUsage::with_capacity(8 << 30),
            disk: ResourceUsage::default(),
            accelerator: None,
            pod_count: 0,
            conditions: NodeConditions::default(),
            labels: BTreeMap::new(),
        }
    }

    #[test]
    fn test_safe_percent_zero_capacity() {
        assert_eq!(safe_percent(500, 0), 0.0);
        assert_eq!(safe_percent(0, 0), 0.0);
        assert_eq!(safe_percent(-5, 100), 0.0);
    }

    #[test]
    fn test_safe_percent_not_clamped() {
        assert_eq!(safe_percent(1000, 4000), 25.0);
        assert_eq!(safe_percent(6000, 4000), 150.0);
    }

    #[test]
    fn test_resource_usage_set_current() {
        let mut usage = ResourceUsage::with_capacity(4000);
        usage.set_current(1000);
        assert_eq!(usage.current, 1000);
        assert_eq!(usage.percent, 25.0);

        let mut empty = ResourceUsage::with_capacity(0);
        empty.set_current(1000);
        assert_eq!(empty.percent, 0.0);
        assert!(empty.percent.is_finite());
    }

    #[test]
    fn test_totals_sum_over_nodes() {
        let mut gpu_node = node("gpu-1", (500, 2500), NodeStatus::NotReady);
        gpu_node.accelerator = Some(AcceleratorInfo {
            count: 2,
            ..Default::default()
        });
        let nodes = vec![node("a", (1000, 4000), NodeStatus::Ready), gpu_node];

        let totals = ClusterTotals::compute(&nodes, &[]);
        assert_eq!(totals.cpu_capacity, 6500);
        assert_eq!(totals.cpu_used, 1500);
        // floor per node: 4 + 2
        assert_eq!(totals.cpu_core_count, 6);
        assert_eq!(totals.accelerator_count, 2);
        assert_eq!(totals.node_count, 2);
        assert_eq!(totals.ready_node_count, 1);
        assert_eq!(totals.memory_capacity, 2 * (8 << 30));
    }

    #[test]
    fn test_status_ordinals() {
        assert!(NodeStatus::Ready < NodeStatus::NotReady);
        assert!(NodeStatus::NotReady < NodeStatus::Unknown);
        assert!(PodStatus::Running < PodStatus::Pending);
        assert_eq!(PodStatus::from_phase("Evicted"), PodStatus::Unknown);
    }

    #[test]
    fn test_node_serialized_field_names() {
        let value = serde_json::to_value(node("a", (1000, 4000), NodeStatus::Ready)).unwrap();
        assert_eq!(value["Name"], "a");
        assert_eq!(value["Status"], "Ready");
        assert_eq!(value["CPU"]["Percent"], 25.0);
        assert!(value["GPU"].is_null());
        assert_eq!(value["Conditions"]["PIDPressure"], false);
        assert_eq!(value["Conditions"]["NetworkUnavail"], false);
        assert_eq!(value["PodCount"], 0);
    }
}
