//! In-memory resource-state source for tests

use crate::source::{
    ConditionReport, NodeDescriptor, ResourceAmounts, ResourceStateSource, UsageSample,
    WorkloadDescriptor, WorkloadKey,
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Which read a toggle applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Read {
    Nodes,
    NodeUsage,
    Pods,
    PodUsage,
}

#[derive(Default)]
pub struct MockSource {
    nodes: Mutex<Vec<NodeDescriptor>>,
    node_usage: Mutex<HashMap<String, UsageSample>>,
    pods: Mutex<Vec<WorkloadDescriptor>>,
    pod_usage: Mutex<HashMap<WorkloadKey, UsageSample>>,
    failing: [AtomicBool; 4],
    slow_usage: Mutex<Option<Duration>>,
    slow_nodes: Mutex<Option<Duration>>,
    /// Number of node descriptor reads, i.e. cycles started
    pub cycles: AtomicUsize,
}

fn slot(read: Read) -> usize {
    match read {
        Read::Nodes => 0,
        Read::NodeUsage => 1,
        Read::Pods => 2,
        Read::PodUsage => 3,
    }
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(self, name: &str, cpu_milli: i64, memory_bytes: i64) -> Self {
        self.nodes
            .lock()
            .unwrap()
            .push(node_descriptor(name, cpu_milli, memory_bytes));
        self
    }

    pub fn with_node_usage(self, name: &str, cpu_milli: i64, memory_bytes: i64) -> Self {
        self.node_usage.lock().unwrap().insert(
            name.to_string(),
            UsageSample {
                cpu_milli,
                memory_bytes,
            },
        );
        self
    }

    pub fn with_pod(self, namespace: &str, name: &str, node: &str) -> Self {
        self.pods.lock().unwrap().push(WorkloadDescriptor {
            namespace: namespace.to_string(),
            name: name.to_string(),
            node_name: node.to_string(),
            phase: "Running".to_string(),
            container_count: 1,
            restart_counts: vec![0],
        });
        self
    }

    pub fn with_pod_usage(self, namespace: &str, name: &str, cpu_milli: i64, memory_bytes: i64) -> Self {
        self.pod_usage.lock().unwrap().insert(
            WorkloadKey::new(namespace, name),
            UsageSample {
                cpu_milli,
                memory_bytes,
            },
        );
        self
    }

    /// Usage reads sleep this long before answering
    pub fn with_slow_usage(self, delay: Duration) -> Self {
        *self.slow_usage.lock().unwrap() = Some(delay);
        self
    }

    /// The node descriptor read sleeps this long before answering
    pub fn set_slow_nodes(&self, delay: Option<Duration>) {
        *self.slow_nodes.lock().unwrap() = delay;
    }

    pub fn set_failing(&self, read: Read, failing: bool) {
        self.failing[slot(read)].store(failing, Ordering::SeqCst);
    }

    pub fn set_node_usage(&self, name: &str, cpu_milli: i64) {
        if let Some(sample) = self.node_usage.lock().unwrap().get_mut(name) {
            sample.cpu_milli = cpu_milli;
        }
    }

    fn check(&self, read: Read) -> Result<()> {
        if self.failing[slot(read)].load(Ordering::SeqCst) {
            bail!("{read:?} unavailable");
        }
        Ok(())
    }

    async fn usage_delay(&self) {
        let delay = *self.slow_usage.lock().unwrap();
        sleep_for(delay).await;
    }
}

async fn sleep_for(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

pub fn node_descriptor(name: &str, cpu_milli: i64, memory_bytes: i64) -> NodeDescriptor {
    NodeDescriptor {
        name: name.to_string(),
        capacity: ResourceAmounts {
            cpu_milli,
            memory_bytes,
            ephemeral_storage_bytes: Some(100 << 30),
            accelerator_count: None,
        },
        allocatable: ResourceAmounts {
            cpu_milli,
            memory_bytes,
            ..Default::default()
        },
        conditions: vec![ConditionReport::new("Ready", true)],
        labels: Default::default(),
    }
}

#[async_trait]
impl ResourceStateSource for MockSource {
    async fn list_node_descriptors(&self) -> Result<Vec<NodeDescriptor>> {
        self.cycles.fetch_add(1, Ordering::SeqCst);
        let delay = *self.slow_nodes.lock().unwrap();
        sleep_for(delay).await;
        self.check(Read::Nodes)?;
        Ok(self.nodes.lock().unwrap().clone())
    }

    async fn list_node_usage(&self) -> Result<HashMap<String, UsageSample>> {
        self.usage_delay().await;
        self.check(Read::NodeUsage)?;
        Ok(self.node_usage.lock().unwrap().clone())
    }

    async fn list_workload_descriptors(&self) -> Result<Vec<WorkloadDescriptor>> {
        self.check(Read::Pods)?;
        Ok(self.pods.lock().unwrap().clone())
    }

    async fn list_workload_usage(&self) -> Result<HashMap<WorkloadKey, UsageSample>> {
        self.usage_delay().await;
        self.check(Read::PodUsage)?;
        Ok(self.pod_usage.lock().unwrap().clone())
    }
}
