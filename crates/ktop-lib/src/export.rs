//! JSON documents for `ktop --show`
//!
//! Key names here are a stable contract for scripts; change them only
//! together with a major version bump.

use crate::error::UnknownExportKind;
use crate::models::ClusterSnapshot;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Which document to print
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Cluster-wide totals
    Resources,
    /// Every pod, unfiltered
    Pods,
    /// Every node
    Nodes,
}

impl ExportKind {
    pub const ALL: [ExportKind; 3] = [ExportKind::Resources, ExportKind::Pods, ExportKind::Nodes];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Resources => "resources",
            ExportKind::Pods => "pods",
            ExportKind::Nodes => "nodes",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportKind {
    type Err = UnknownExportKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownExportKind(s.to_string()))
    }
}

/// Cluster totals document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    pub cluster: String,
    pub context: String,
    pub cpu_cores: i64,
    pub cpu_used: i64,
    pub cpu_capacity: i64,
    pub cpu_percent: f64,
    pub memory_used: i64,
    pub memory_capacity: i64,
    pub memory_percent: f64,
    pub disk_used: i64,
    pub disk_capacity: i64,
    pub disk_percent: f64,
    pub gpus: u32,
    pub pods: usize,
    pub nodes: usize,
    pub ready_nodes: usize,
}

impl From<&ClusterSnapshot> for ResourceSummary {
    fn from(snapshot: &ClusterSnapshot) -> Self {
        let totals = &snapshot.totals;
        Self {
            cluster: snapshot.cluster.name.clone(),
            context: snapshot.cluster.context.clone(),
            cpu_cores: totals.cpu_core_count,
            cpu_used: totals.cpu_used,
            cpu_capacity: totals.cpu_capacity,
            cpu_percent: totals.cpu_percent(),
            memory_used: totals.memory_used,
            memory_capacity: totals.memory_capacity,
            memory_percent: totals.memory_percent(),
            disk_used: totals.disk_used,
            disk_capacity: totals.disk_capacity,
            disk_percent: totals.disk_percent(),
            gpus: totals.accelerator_count,
            pods: totals.workload_count,
            nodes: totals.node_count,
            ready_nodes: totals.ready_node_count,
        }
    }
}

/// Render the requested document as indented JSON with a trailing newline
pub fn render(snapshot: &ClusterSnapshot, kind: ExportKind) -> serde_json::Result<String> {
    let mut out = match kind {
        ExportKind::Resources => serde_json::to_string_pretty(&ResourceSummary::from(snapshot))?,
        ExportKind::Pods => serde_json::to_string_pretty(&snapshot.pods)?,
        ExportKind::Nodes => serde_json::to_string_pretty(&snapshot.nodes)?,
    };
    out.push('\n');
    Ok(out)
}
