//! Dashboard view state.
//!
//! Everything here is presentation state; the cluster data itself is the
//! latest snapshot read from the store on each tick.

use std::sync::Arc;

use ktop_lib::query::{
    filter_pods, limit, next_namespace, sort_nodes, sort_pods, Cycle, NodeSortField,
    PodSortField, SortOrder, ViewMode,
};
use ktop_lib::{ClusterSnapshot, Node, Pod};
use ratatui::widgets::TableState;

use crate::config::Settings;

/// Which table receives selection keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Nodes,
    Pods,
}

pub struct DashboardState {
    pub view: ViewMode,
    pub node_order: SortOrder<NodeSortField>,
    pub pod_order: SortOrder<PodSortField>,
    /// Namespace filter; empty means all namespaces.
    pub namespace: String,
    pub show_system: bool,
    pub focus: Focus,
    pub show_help: bool,
    pub top_pods: usize,

    pub snapshot: Option<Arc<ClusterSnapshot>>,
    pub namespaces: Vec<String>,
    /// Error of the latest cycle if it produced no snapshot.
    pub failure: Option<Arc<str>>,

    pub node_table: TableState,
    pub pod_table: TableState,
}

impl DashboardState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            view: ViewMode::default(),
            node_order: SortOrder::new(settings.node_sort, false),
            pod_order: SortOrder::new(settings.pod_sort, false),
            namespace: String::new(),
            show_system: settings.all_namespaces,
            focus: Focus::Nodes,
            show_help: false,
            top_pods: settings.top_pods,
            snapshot: None,
            namespaces: Vec::new(),
            failure: None,
            node_table: TableState::default().with_selected(Some(0)),
            pod_table: TableState::default().with_selected(Some(0)),
        }
    }

    /// Install the latest published snapshot.
    pub fn update(&mut self, snapshot: Option<Arc<ClusterSnapshot>>, namespaces: Vec<String>) {
        self.snapshot = snapshot;
        self.namespaces = namespaces;
        self.clamp_selection();
    }

    /// Nodes in the current sort order.
    pub fn sorted_nodes(&self) -> Vec<Node> {
        let Some(snapshot) = &self.snapshot else {
            return Vec::new();
        };
        let mut nodes = snapshot.nodes.clone();
        sort_nodes(&mut nodes, self.node_order.field, self.node_order.ascending);
        nodes
    }

    /// Pods after filtering, sorting and the top-N limit.
    pub fn visible_pods(&self) -> Vec<Pod> {
        let Some(snapshot) = &self.snapshot else {
            return Vec::new();
        };
        let mut pods = filter_pods(&snapshot.pods, &self.namespace, self.show_system);
        sort_pods(&mut pods, self.pod_order.field, self.pod_order.ascending);
        limit(pods, self.top_pods)
    }

    pub fn cycle_node_sort(&mut self) {
        self.node_order.advance();
    }

    pub fn cycle_pod_sort(&mut self) {
        self.pod_order.advance();
    }

    pub fn cycle_namespace(&mut self) {
        self.namespace = next_namespace(&self.namespace, &self.namespaces);
        self.pod_table.select(Some(0));
    }

    /// Returns false if no filter was set.
    pub fn clear_namespace(&mut self) -> bool {
        if self.namespace.is_empty() {
            return false;
        }
        self.namespace.clear();
        self.pod_table.select(Some(0));
        true
    }

    pub fn toggle_system(&mut self) {
        self.show_system = !self.show_system;
        self.clamp_selection();
    }

    /// Single-table views force focus onto the visible table.
    pub fn cycle_view(&mut self) {
        self.view = self.view.next().0;
        match self.view {
            ViewMode::Nodes => self.focus = Focus::Nodes,
            ViewMode::Pods => self.focus = Focus::Pods,
            ViewMode::Split => {}
        }
    }

    /// Only meaningful in split view.
    pub fn toggle_focus(&mut self) {
        if self.view == ViewMode::Split {
            self.focus = match self.focus {
                Focus::Nodes => Focus::Pods,
                Focus::Pods => Focus::Nodes,
            };
        }
    }

    pub fn select_up(&mut self) {
        let table = self.focused_table();
        let selected = table.selected().unwrap_or(0);
        table.select(Some(selected.saturating_sub(1)));
    }

    pub fn select_down(&mut self) {
        let len = self.focused_len();
        let table = self.focused_table();
        let selected = table.selected().unwrap_or(0);
        if selected + 1 < len {
            table.select(Some(selected + 1));
        }
    }

    fn focused_table(&mut self) -> &mut TableState {
        match self.focus {
            Focus::Nodes => &mut self.node_table,
            Focus::Pods => &mut self.pod_table,
        }
    }

    fn focused_len(&self) -> usize {
        match self.focus {
            Focus::Nodes => self.snapshot.as_ref().map_or(0, |s| s.nodes.len()),
            Focus::Pods => self.visible_pods().len(),
        }
    }

    fn clamp_selection(&mut self) {
        let nodes = self.snapshot.as_ref().map_or(0, |s| s.nodes.len());
        let pods = self.visible_pods().len();
        clamp(&mut self.node_table, nodes);
        clamp(&mut self.pod_table, pods);
    }
}

fn clamp(table: &mut TableState, len: usize) {
    let selected = table.selected().unwrap_or(0);
    table.select(Some(selected.min(len.saturating_sub(1))));
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use ktop_lib::{ClusterIdentity, NodeStatus, PodStatus, ResourceUsage};
    use std::time::Duration;

    pub(crate) fn settings() -> Settings {
        Settings {
            kubeconfig: None,
            context: None,
            refresh_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(10),
            top_pods: 30,
            all_namespaces: false,
            node_sort: NodeSortField::Cpu,
            pod_sort: PodSortField::Cpu,
            metrics_port: None,
            log_file: None,
        }
    }

    fn node(name: &str, cpu: i64) -> Node {
        let mut usage = ResourceUsage::with_capacity(1000);
        usage.set_current(cpu);
        Node {
            name: name.to_string(),
            status: NodeStatus::Ready,
            cpu: usage,
            memory: ResourceUsage::default(),
            disk: ResourceUsage::default(),
            accelerator: None,
            pod_count: 0,
            conditions: Default::default(),
            labels: Default::default(),
        }
    }

    fn pod(namespace: &str, name: &str, cpu: i64) -> Pod {
        Pod {
            namespace: namespace.to_string(),
            name: name.to_string(),
            node_name: "n1".to_string(),
            status: PodStatus::Running,
            cpu,
            memory: 0,
            container_count: 1,
            restart_count: 0,
        }
    }

    pub(crate) fn populated() -> DashboardState {
        let snapshot = ClusterSnapshot::new(
            Utc::now(),
            ClusterIdentity::default(),
            vec![node("n1", 100), node("n2", 900)],
            vec![
                pod("kube-system", "coredns", 500),
                pod("shop", "web", 300),
                pod("shop", "db", 700),
                pod("default", "job", 10),
            ],
            None,
        );
        let mut state = DashboardState::new(&settings());
        state.update(
            Some(Arc::new(snapshot)),
            vec![
                "default".to_string(),
                "kube-system".to_string(),
                "shop".to_string(),
            ],
        );
        state
    }

    fn pod_names(state: &DashboardState) -> Vec<String> {
        state.visible_pods().into_iter().map(|p| p.name).collect()
    }

    #[test]
    fn test_defaults() {
        let state = DashboardState::new(&settings());
        assert_eq!(state.view, ViewMode::Split);
        assert_eq!(state.node_order, SortOrder::new(NodeSortField::Cpu, false));
        assert_eq!(state.pod_order, SortOrder::new(PodSortField::Cpu, false));
        assert!(state.namespace.is_empty());
        assert!(!state.show_system);
        assert!(state.visible_pods().is_empty());
    }

    #[test]
    fn test_visible_pods_filters_sorts_and_limits() {
        let mut state = populated();
        assert_eq!(pod_names(&state), vec!["db", "web", "job"]);

        state.toggle_system();
        assert_eq!(pod_names(&state), vec!["db", "coredns", "web", "job"]);

        state.top_pods = 2;
        assert_eq!(pod_names(&state), vec!["db", "coredns"]);
    }

    #[test]
    fn test_sorted_nodes_descending_cpu() {
        let state = populated();
        let names: Vec<_> = state.sorted_nodes().into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["n2", "n1"]);
    }

    #[test]
    fn test_namespace_cycle_and_clear() {
        let mut state = populated();
        state.cycle_namespace();
        assert_eq!(state.namespace, "default");
        state.cycle_namespace();
        state.cycle_namespace();
        assert_eq!(state.namespace, "shop");
        assert_eq!(pod_names(&state), vec!["db", "web"]);

        assert!(state.clear_namespace());
        assert!(state.namespace.is_empty());
        assert!(!state.clear_namespace());
    }

    #[test]
    fn test_view_cycle_moves_focus() {
        let mut state = populated();
        state.toggle_focus();
        assert_eq!(state.focus, Focus::Pods);

        state.cycle_view();
        assert_eq!(state.view, ViewMode::Nodes);
        assert_eq!(state.focus, Focus::Nodes);

        state.toggle_focus();
        assert_eq!(state.focus, Focus::Nodes);

        state.cycle_view();
        assert_eq!(state.focus, Focus::Pods);
        state.cycle_view();
        assert_eq!(state.view, ViewMode::Split);
    }

    #[test]
    fn test_selection_stays_in_bounds() {
        let mut state = populated();
        state.select_up();
        assert_eq!(state.node_table.selected(), Some(0));

        for _ in 0..5 {
            state.select_down();
        }
        assert_eq!(state.node_table.selected(), Some(1));

        state.toggle_focus();
        for _ in 0..10 {
            state.select_down();
        }
        assert_eq!(state.pod_table.selected(), Some(2));

        state.update(None, Vec::new());
        assert_eq!(state.pod_table.selected(), Some(0));
    }

    #[test]
    fn test_sort_cycle_flips_direction_on_wrap() {
        let mut state = populated();
        for _ in 0..NodeSortField::ORDER.len() {
            state.cycle_node_sort();
        }
        assert_eq!(state.node_order, SortOrder::new(NodeSortField::Cpu, true));
    }
}
