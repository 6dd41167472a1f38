//! Merging descriptors with usage samples
//!
//! Everything here is pure: given one cycle's reads it produces that
//! cycle's entities. Missing usage samples leave usage at zero.

use crate::error::CollectWarning;
use crate::models::{AcceleratorInfo, Node, NodeConditions, NodeStatus, Pod, PodStatus, ResourceUsage};
use crate::source::{
    ConditionReport, NodeDescriptor, UsageSample, WorkloadDescriptor, WorkloadKey,
    ACCELERATOR_MEMORY_LABEL,
};
use std::collections::{BTreeSet, HashMap};

/// A best-effort value plus the warning explaining why it may be degraded
#[derive(Debug, Clone, PartialEq)]
pub struct Partial<T> {
    pub value: T,
    pub warning: Option<CollectWarning>,
}

impl<T> Partial<T> {
    pub fn complete(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    pub fn degraded(value: T, warning: CollectWarning) -> Self {
        Self {
            value,
            warning: Some(warning),
        }
    }
}

/// Combine two warnings; the earlier one always wins
pub fn first_warning(
    first: Option<CollectWarning>,
    second: Option<CollectWarning>,
) -> Option<CollectWarning> {
    first.or(second)
}

/// Ready if the `Ready` condition is active, NotReady if inactive, Unknown if absent
pub fn node_status(conditions: &[ConditionReport]) -> NodeStatus {
    match conditions.iter().find(|c| c.kind == "Ready") {
        Some(c) if c.active => NodeStatus::Ready,
        Some(_) => NodeStatus::NotReady,
        None => NodeStatus::Unknown,
    }
}

pub fn node_conditions(conditions: &[ConditionReport]) -> NodeConditions {
    let mut result = NodeConditions::default();
    for condition in conditions.iter().filter(|c| c.active) {
        match condition.kind.as_str() {
            "MemoryPressure" => result.memory_pressure = true,
            "DiskPressure" => result.disk_pressure = true,
            "PIDPressure" => result.pid_pressure = true,
            "NetworkUnavailable" => result.network_unavailable = true,
            _ => {}
        }
    }
    result
}

/// Accelerator info from capacity (then allocatable); `None` when absent or zero
pub fn accelerator_info(descriptor: &NodeDescriptor) -> Option<AcceleratorInfo> {
    let count = descriptor
        .capacity
        .accelerator_count
        .or(descriptor.allocatable.accelerator_count)?;
    if count <= 0 {
        return None;
    }

    let memory_total = descriptor
        .labels
        .get(ACCELERATOR_MEMORY_LABEL)
        .and_then(|mib| mib.parse::<i64>().ok())
        .map(|mib| mib * 1024 * 1024)
        .unwrap_or(0);

    Some(AcceleratorInfo {
        count: u32::try_from(count).unwrap_or(u32::MAX),
        memory_used: 0,
        memory_total,
        utilization: 0.0,
    })
}

/// Build pods from descriptors, attributing usage by `namespace/name`
pub fn merge_pods(
    descriptors: Vec<WorkloadDescriptor>,
    usage: Option<&HashMap<WorkloadKey, UsageSample>>,
) -> Vec<Pod> {
    descriptors
        .into_iter()
        .map(|d| {
            let sample = usage
                .and_then(|u| u.get(&d.key()))
                .copied()
                .unwrap_or_default();

            Pod {
                status: PodStatus::from_phase(&d.phase),
                cpu: sample.cpu_milli,
                memory: sample.memory_bytes,
                container_count: d.container_count,
                restart_count: d.restart_counts.iter().map(|&r| i64::from(r)).sum(),
                namespace: d.namespace,
                name: d.name,
                node_name: d.node_name,
            }
        })
        .collect()
}

/// Build nodes from descriptors, usage samples and this cycle's pods
pub fn merge_nodes(
    descriptors: Vec<NodeDescriptor>,
    usage: Option<&HashMap<String, UsageSample>>,
    pods: &[Pod],
) -> Vec<Node> {
    let mut pods_per_node: HashMap<&str, usize> = HashMap::new();
    for pod in pods {
        *pods_per_node.entry(pod.node_name.as_str()).or_default() += 1;
    }

    descriptors
        .into_iter()
        .map(|d| {
            let mut cpu = ResourceUsage::with_capacity(d.capacity.cpu_milli);
            let mut memory = ResourceUsage::with_capacity(d.capacity.memory_bytes);
            let disk = ResourceUsage::with_capacity(d.capacity.ephemeral_storage_bytes.unwrap_or(0));

            if let Some(sample) = usage.and_then(|u| u.get(&d.name)) {
                cpu.set_current(sample.cpu_milli);
                memory.set_current(sample.memory_bytes);
            }

            Node {
                status: node_status(&d.conditions),
                conditions: node_conditions(&d.conditions),
                accelerator: accelerator_info(&d),
                pod_count: pods_per_node.get(d.name.as_str()).copied().unwrap_or(0),
                cpu,
                memory,
                disk,
                name: d.name,
                labels: d.labels,
            }
        })
        .collect()
}

/// Distinct namespaces among pods, sorted lexically
pub fn distinct_namespaces(pods: &[Pod]) -> Vec<String> {
    pods.iter()
        .map(|p| p.namespace.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ResourceAmounts;

    fn descriptor(name: &str, cpu_milli: i64) -> NodeDescriptor {
        NodeDescriptor {
            name: name.to_string(),
            capacity: ResourceAmounts {
                cpu_milli,
                memory_bytes: 8 << 30,
                ..Default::default()
            },
            conditions: vec![ConditionReport::new("Ready", true)],
            ..Default::default()
        }
    }

    fn workload(namespace: &str, name: &str, node: &str) -> WorkloadDescriptor {
        WorkloadDescriptor {
            namespace: namespace.to_string(),
            name: name.to_string(),
            node_name: node.to_string(),
            phase: "Running".to_string(),
            container_count: 1,
            restart_counts: vec![2, 3],
        }
    }

    #[test]
    fn test_node_status_derivation() {
        assert_eq!(node_status(&[ConditionReport::new("Ready", true)]), NodeStatus::Ready);
        assert_eq!(
            node_status(&[ConditionReport::new("Ready", false)]),
            NodeStatus::NotReady
        );
        assert_eq!(
            node_status(&[ConditionReport::new("MemoryPressure", true)]),
            NodeStatus::Unknown
        );
        assert_eq!(node_status(&[]), NodeStatus::Unknown);
    }

    #[test]
    fn test_node_conditions_only_active() {
        let conditions = node_conditions(&[
            ConditionReport::new("MemoryPressure", true),
            ConditionReport::new("DiskPressure", false),
            ConditionReport::new("PIDPressure", true),
            ConditionReport::new("NetworkUnavailable", false),
            ConditionReport::new("Ready", true),
        ]);
        assert!(conditions.memory_pressure);
        assert!(!conditions.disk_pressure);
        assert!(conditions.pid_pressure);
        assert!(!conditions.network_unavailable);
    }

    #[test]
    fn test_accelerator_presence() {
        let mut node = descriptor("gpu", 4000);
        assert_eq!(accelerator_info(&node), None);

        node.capacity.accelerator_count = Some(0);
        assert_eq!(accelerator_info(&node), None);

        node.capacity.accelerator_count = None;
        node.allocatable.accelerator_count = Some(4);
        node.labels
            .insert(ACCELERATOR_MEMORY_LABEL.to_string(), "16384".to_string());
        let info = accelerator_info(&node).unwrap();
        assert_eq!(info.count, 4);
        assert_eq!(info.memory_total, 16384 * 1024 * 1024);
        assert_eq!(info.utilization, 0.0);
    }

    #[test]
    fn test_merge_nodes_with_and_without_usage() {
        let usage = HashMap::from([(
            "a".to_string(),
            UsageSample {
                cpu_milli: 1000,
                memory_bytes: 2 << 30,
            },
        )]);

        let nodes = merge_nodes(
            vec![descriptor("a", 4000), descriptor("b", 2000)],
            Some(&usage),
            &[],
        );

        assert_eq!(nodes[0].cpu.current, 1000);
        assert_eq!(nodes[0].cpu.percent, 25.0);
        assert_eq!(nodes[0].memory.percent, 25.0);
        assert_eq!(nodes[1].cpu.current, 0);
        assert_eq!(nodes[1].cpu.percent, 0.0);
        assert_eq!(nodes[1].cpu.capacity, 2000);
    }

    #[test]
    fn test_merge_nodes_counts_pods() {
        let pods = merge_pods(
            vec![
                workload("shop", "web-0", "a"),
                workload("shop", "web-1", "a"),
                workload("ops", "agent", "b"),
                workload("ops", "pending", ""),
            ],
            None,
        );

        let nodes = merge_nodes(vec![descriptor("a", 1000), descriptor("b", 1000)], None, &pods);
        assert_eq!(nodes[0].pod_count, 2);
        assert_eq!(nodes[1].pod_count, 1);
    }

    #[test]
    fn test_merge_pods_attributes_usage_by_key() {
        let usage = HashMap::from([(
            WorkloadKey::new("shop", "web-0"),
            UsageSample {
                cpu_milli: 150,
                memory_bytes: 1024,
            },
        )]);

        let pods = merge_pods(
            vec![workload("shop", "web-0", "a"), workload("other", "web-0", "a")],
            Some(&usage),
        );

        assert_eq!(pods[0].cpu, 150);
        assert_eq!(pods[0].memory, 1024);
        assert_eq!(pods[0].restart_count, 5);
        assert_eq!(pods[0].status, PodStatus::Running);
        // Same name in another namespace gets nothing
        assert_eq!(pods[1].cpu, 0);
    }

    #[test]
    fn test_distinct_namespaces_sorted() {
        let pods = merge_pods(
            vec![
                workload("shop", "a", "n"),
                workload("kube-system", "b", "n"),
                workload("shop", "c", "n"),
                workload("argo", "d", "n"),
            ],
            None,
        );
        assert_eq!(distinct_namespaces(&pods), vec!["argo", "kube-system", "shop"]);
    }

    #[test]
    fn test_first_warning_wins() {
        let nodes = CollectWarning::NodeUsage("down".to_string());
        let pods = CollectWarning::WorkloadUsage("down".to_string());

        assert_eq!(
            first_warning(Some(nodes.clone()), Some(pods.clone())),
            Some(nodes.clone())
        );
        assert_eq!(first_warning(None, Some(pods.clone())), Some(pods));
        assert_eq!(first_warning(Some(nodes.clone()), None), Some(nodes));
        assert_eq!(first_warning(None, None), None);
    }

    #[test]
    fn test_partial_constructors() {
        let complete = Partial::complete(3);
        assert!(complete.warning.is_none());

        let degraded = Partial::degraded(0, CollectWarning::NodeUsage("x".to_string()));
        assert_eq!(degraded.value, 0);
        assert!(degraded.warning.is_some());
    }
}
