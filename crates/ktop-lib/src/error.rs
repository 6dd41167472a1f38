//! Error types for the collection pipeline

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fatal failure of a collection cycle; no snapshot is produced
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("failed to fetch nodes: {0:#}")]
    NodeDescriptors(anyhow::Error),

    #[error("failed to fetch pods: {0:#}")]
    WorkloadDescriptors(anyhow::Error),

    #[error("deadline of {timeout:?} exceeded while fetching {read}")]
    DeadlineExceeded { timeout: Duration, read: &'static str },
}

impl CollectError {
    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            CollectError::NodeDescriptors(_) => "node_descriptors",
            CollectError::WorkloadDescriptors(_) => "workload_descriptors",
            CollectError::DeadlineExceeded { .. } => "deadline_exceeded",
        }
    }
}

/// Non-fatal failure of a usage-sample read; carried on the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "source", content = "message", rename_all = "snake_case")]
pub enum CollectWarning {
    #[error("failed to fetch node metrics: {0}")]
    NodeUsage(String),

    #[error("failed to fetch pod metrics: {0}")]
    WorkloadUsage(String),
}

impl CollectWarning {
    /// Same label as the serialized `source` tag
    pub fn kind(&self) -> &'static str {
        match self {
            CollectWarning::NodeUsage(_) => "node_usage",
            CollectWarning::WorkloadUsage(_) => "workload_usage",
        }
    }
}

/// Malformed Kubernetes resource quantity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,

    #[error("invalid quantity {0:?}")]
    Invalid(String),
}

/// Unrecognised `--show` document name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown export kind {0:?} (expected resources, pods or nodes)")]
pub struct UnknownExportKind(pub String);
