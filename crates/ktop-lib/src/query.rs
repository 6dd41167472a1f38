//! Sorting, filtering and limiting of snapshot entities
//!
//! Sort fields and view modes are closed enums whose cycling order is a
//! single `ORDER` table; see [`Cycle`].

use crate::models::{Node, Pod};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Namespaces reserved for cluster-internal components
pub const SYSTEM_NAMESPACES: &[&str] = &["kube-system", "kube-public", "kube-node-lease"];

pub fn is_system_namespace(namespace: &str) -> bool {
    SYSTEM_NAMESPACES.contains(&namespace)
}

/// A closed enumeration with a fixed cycling order
pub trait Cycle: Copy + PartialEq + Sized + 'static {
    /// Every variant, in cycling order
    const ORDER: &'static [Self];

    /// The following variant, and whether the cycle wrapped to the start
    fn next(self) -> (Self, bool) {
        let position = Self::ORDER.iter().position(|v| *v == self).unwrap_or(0);
        let next = (position + 1) % Self::ORDER.len();
        (Self::ORDER[next], next == 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeSortField {
    #[default]
    Name,
    Cpu,
    Memory,
    Status,
    Pods,
}

impl Cycle for NodeSortField {
    const ORDER: &'static [Self] = &[
        NodeSortField::Name,
        NodeSortField::Cpu,
        NodeSortField::Memory,
        NodeSortField::Status,
        NodeSortField::Pods,
    ];
}

impl NodeSortField {
    /// Parse a sort key; anything unrecognised sorts by name
    pub fn parse(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "cpu" => NodeSortField::Cpu,
            "memory" | "mem" => NodeSortField::Memory,
            "status" => NodeSortField::Status,
            "pods" => NodeSortField::Pods,
            _ => NodeSortField::Name,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeSortField::Name => "Name",
            NodeSortField::Cpu => "CPU",
            NodeSortField::Memory => "Memory",
            NodeSortField::Status => "Status",
            NodeSortField::Pods => "Pods",
        }
    }
}

impl fmt::Display for NodeSortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodSortField {
    Namespace,
    #[default]
    Name,
    Cpu,
    Memory,
    Status,
}

impl Cycle for PodSortField {
    const ORDER: &'static [Self] = &[
        PodSortField::Namespace,
        PodSortField::Name,
        PodSortField::Cpu,
        PodSortField::Memory,
        PodSortField::Status,
    ];
}

impl PodSortField {
    /// Parse a sort key; anything unrecognised sorts by name
    pub fn parse(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "namespace" | "ns" => PodSortField::Namespace,
            "cpu" => PodSortField::Cpu,
            "memory" | "mem" => PodSortField::Memory,
            "status" => PodSortField::Status,
            _ => PodSortField::Name,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PodSortField::Namespace => "Namespace",
            PodSortField::Name => "Name",
            PodSortField::Cpu => "CPU",
            PodSortField::Memory => "Memory",
            PodSortField::Status => "Status",
        }
    }
}

impl fmt::Display for PodSortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Dashboard layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewMode {
    #[default]
    Split,
    Nodes,
    Pods,
}

impl Cycle for ViewMode {
    const ORDER: &'static [Self] = &[ViewMode::Split, ViewMode::Nodes, ViewMode::Pods];
}

impl ViewMode {
    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Split => "Split",
            ViewMode::Nodes => "Nodes",
            ViewMode::Pods => "Pods",
        }
    }
}

/// A sort field plus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder<F> {
    pub field: F,
    pub ascending: bool,
}

impl<F: Cycle> SortOrder<F> {
    pub fn new(field: F, ascending: bool) -> Self {
        Self { field, ascending }
    }

    /// Move to the next field, flipping direction when the table wraps
    pub fn advance(&mut self) {
        let (next, wrapped) = self.field.next();
        self.field = next;
        if wrapped {
            self.ascending = !self.ascending;
        }
    }
}

fn caseless(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

fn compare_nodes(a: &Node, b: &Node, field: NodeSortField) -> Ordering {
    match field {
        NodeSortField::Name => caseless(&a.name, &b.name),
        NodeSortField::Cpu => a.cpu.percent.total_cmp(&b.cpu.percent),
        NodeSortField::Memory => a.memory.percent.total_cmp(&b.memory.percent),
        NodeSortField::Status => a.status.cmp(&b.status),
        NodeSortField::Pods => a.pod_count.cmp(&b.pod_count),
    }
}

fn compare_pods(a: &Pod, b: &Pod, field: PodSortField) -> Ordering {
    match field {
        PodSortField::Namespace => caseless(&a.namespace, &b.namespace),
        PodSortField::Name => caseless(&a.name, &b.name),
        PodSortField::Cpu => a.cpu.cmp(&b.cpu),
        PodSortField::Memory => a.memory.cmp(&b.memory),
        PodSortField::Status => a.status.cmp(&b.status),
    }
}

/// Stable sort; equal keys keep their input order in either direction
pub fn sort_nodes(nodes: &mut [Node], field: NodeSortField, ascending: bool) {
    if ascending {
        nodes.sort_by(|a, b| compare_nodes(a, b, field));
    } else {
        nodes.sort_by(|a, b| compare_nodes(b, a, field));
    }
}

/// Stable sort; equal keys keep their input order in either direction
pub fn sort_pods(pods: &mut [Pod], field: PodSortField, ascending: bool) {
    if ascending {
        pods.sort_by(|a, b| compare_pods(a, b, field));
    } else {
        pods.sort_by(|a, b| compare_pods(b, a, field));
    }
}

/// Keep pods in `namespace` (all when empty), hiding system namespaces unless asked
pub fn filter_pods<'a, I>(pods: I, namespace: &str, include_system: bool) -> Vec<Pod>
where
    I: IntoIterator<Item = &'a Pod>,
{
    pods.into_iter()
        .filter(|p| namespace.is_empty() || p.namespace == namespace)
        .filter(|p| include_system || !is_system_namespace(&p.namespace))
        .cloned()
        .collect()
}

/// Keep the first `n` entries
pub fn limit<T>(mut items: Vec<T>, n: usize) -> Vec<T> {
    items.truncate(n);
    items
}

/// Namespace after `current` in `namespaces`; "" means all
///
/// Cycles "" → first → … → last → "". A filter that is no longer present
/// resets to "".
pub fn next_namespace(current: &str, namespaces: &[String]) -> String {
    if namespaces.is_empty() {
        return current.to_string();
    }
    if current.is_empty() {
        return namespaces[0].clone();
    }
    match namespaces.iter().position(|ns| ns == current) {
        Some(i) if i + 1 < namespaces.len() => namespaces[i + 1].clone(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeStatus, PodStatus, ResourceUsage};

    fn node(name: &str, cpu_percent_of_1000: i64, status: NodeStatus, pods: usize) -> Node {
        let mut cpu = ResourceUsage::with_capacity(1000);
        cpu.set_current(cpu_percent_of_1000);
        Node {
            name: name.to_string(),
            status,
            cpu,
            memory: ResourceUsage::default(),
            disk: ResourceUsage::default(),
            accelerator: None,
            pod_count: pods,
            conditions: Default::default(),
            labels: Default::default(),
        }
    }

    fn pod(namespace: &str, name: &str, cpu: i64) -> Pod {
        Pod {
            namespace: namespace.to_string(),
            name: name.to_string(),
            node_name: "n".to_string(),
            status: PodStatus::Running,
            cpu,
            memory: 0,
            container_count: 1,
            restart_count: 0,
        }
    }

    fn names(pods: &[Pod]) -> Vec<&str> {
        pods.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_node_sort_field_cycle_wraps() {
        let mut field = NodeSortField::Name;
        let mut wraps = 0;
        for _ in 0..NodeSortField::ORDER.len() {
            let (next, wrapped) = field.next();
            field = next;
            wraps += usize::from(wrapped);
        }
        assert_eq!(field, NodeSortField::Name);
        assert_eq!(wraps, 1);
        assert_eq!(NodeSortField::Pods.next(), (NodeSortField::Name, true));
        assert_eq!(NodeSortField::Cpu.next(), (NodeSortField::Memory, false));
    }

    #[test]
    fn test_sort_order_flips_on_wrap() {
        let mut order = SortOrder::new(PodSortField::Memory, false);
        order.advance();
        assert_eq!(order, SortOrder::new(PodSortField::Status, false));
        order.advance();
        assert_eq!(order, SortOrder::new(PodSortField::Namespace, true));
    }

    #[test]
    fn test_view_mode_cycle() {
        assert_eq!(ViewMode::Split.next(), (ViewMode::Nodes, false));
        assert_eq!(ViewMode::Nodes.next(), (ViewMode::Pods, false));
        assert_eq!(ViewMode::Pods.next(), (ViewMode::Split, true));
    }

    #[test]
    fn test_unknown_sort_key_is_name() {
        assert_eq!(NodeSortField::parse("bogus"), NodeSortField::Name);
        assert_eq!(NodeSortField::parse("CPU"), NodeSortField::Cpu);
        assert_eq!(PodSortField::parse(""), PodSortField::Name);
        assert_eq!(PodSortField::parse("mem"), PodSortField::Memory);
    }

    #[test]
    fn test_sort_nodes_by_name_case_insensitive() {
        let mut nodes = vec![
            node("beta", 0, NodeStatus::Ready, 0),
            node("Alpha", 0, NodeStatus::Ready, 0),
            node("gamma", 0, NodeStatus::Ready, 0),
        ];
        sort_nodes(&mut nodes, NodeSortField::Name, true);
        let order: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(order, vec!["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_sort_nodes_by_status_ordinal() {
        let mut nodes = vec![
            node("a", 0, NodeStatus::Unknown, 0),
            node("b", 0, NodeStatus::Ready, 0),
            node("c", 0, NodeStatus::NotReady, 0),
        ];
        sort_nodes(&mut nodes, NodeSortField::Status, true);
        let order: Vec<_> = nodes.iter().map(|n| n.status).collect();
        assert_eq!(
            order,
            vec![NodeStatus::Ready, NodeStatus::NotReady, NodeStatus::Unknown]
        );
    }

    #[test]
    fn test_reversing_direction_reverses_distinct_keys() {
        let mut ascending = vec![
            node("a", 300, NodeStatus::Ready, 1),
            node("b", 100, NodeStatus::Ready, 2),
            node("c", 200, NodeStatus::Ready, 3),
        ];
        sort_nodes(&mut ascending, NodeSortField::Cpu, true);

        let mut descending = ascending.clone();
        sort_nodes(&mut descending, NodeSortField::Cpu, false);

        descending.reverse();
        assert_eq!(ascending, descending);
    }

    #[test]
    fn test_equal_keys_stay_stable_in_both_directions() {
        let pods = vec![
            pod("x", "first", 100),
            pod("x", "second", 100),
            pod("x", "big", 500),
            pod("x", "third", 100),
        ];

        let mut asc = pods.clone();
        sort_pods(&mut asc, PodSortField::Cpu, true);
        assert_eq!(names(&asc), vec!["first", "second", "third", "big"]);

        let mut desc = pods;
        sort_pods(&mut desc, PodSortField::Cpu, false);
        assert_eq!(names(&desc), vec!["big", "first", "second", "third"]);
    }

    #[test]
    fn test_filter_hides_system_namespaces() {
        let pods = vec![
            pod("kube-system", "coredns", 1),
            pod("kube-public", "info", 1),
            pod("kube-node-lease", "lease", 1),
            pod("default", "app", 1),
            pod("shop", "web", 1),
        ];

        let visible = filter_pods(&pods, "", false);
        assert_eq!(names(&visible), vec!["app", "web"]);
        assert!(visible.iter().all(|p| !is_system_namespace(&p.namespace)));

        assert_eq!(filter_pods(&pods, "", true).len(), pods.len());
        assert_eq!(names(&filter_pods(&pods, "shop", false)), vec!["web"]);
        assert_eq!(names(&filter_pods(&pods, "kube-system", true)), vec!["coredns"]);
        assert!(filter_pods(&pods, "kube-system", false).is_empty());
    }

    #[test]
    fn test_limit() {
        let items: Vec<u32> = (0..5).collect();
        assert_eq!(limit(items.clone(), 3), vec![0, 1, 2]);
        assert_eq!(limit(items.clone(), 5), items);
        assert_eq!(limit(items.clone(), 50), items);
        assert!(limit(items, 0).is_empty());
    }

    #[test]
    fn test_next_namespace_cycle() {
        let namespaces = vec!["a".to_string(), "b".to_string()];
        assert_eq!(next_namespace("", &namespaces), "a");
        assert_eq!(next_namespace("a", &namespaces), "b");
        assert_eq!(next_namespace("b", &namespaces), "");
        assert_eq!(next_namespace("gone", &namespaces), "");
        assert_eq!(next_namespace("", &[]), "");
    }
}
