//! Kubernetes API backed resource-state source

use super::metrics_api::{NodeMetrics, PodMetrics};
use super::quantity;
use super::{
    ConditionReport, NodeDescriptor, ResourceAmounts, ResourceStateSource, UsageSample,
    WorkloadDescriptor, WorkloadKey, ACCELERATOR_RESOURCE,
};
use crate::models::ClusterIdentity;
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// How to reach the cluster
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Explicit kubeconfig path; `KUBECONFIG` or `~/.kube/config` otherwise
    pub kubeconfig: Option<PathBuf>,
    /// Context override; the kubeconfig's current context otherwise
    pub context: Option<String>,
    /// Per-request read timeout
    pub timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Resource-state source reading `core/v1` and `metrics.k8s.io/v1beta1`
#[derive(Clone)]
pub struct KubeSource {
    client: Client,
    identity: ClusterIdentity,
}

impl KubeSource {
    /// Connect using in-cluster configuration, falling back to kubeconfig
    pub async fn connect(options: &ConnectOptions) -> Result<Self> {
        let (mut config, identity) = match Config::incluster() {
            Ok(config) => {
                let server = config.cluster_url.to_string();
                let identity = ClusterIdentity {
                    name: server.clone(),
                    context: String::new(),
                    server,
                    namespace: config.default_namespace.clone(),
                };
                (config, identity)
            }
            Err(e) => {
                debug!(error = %e, "In-cluster configuration unavailable, loading kubeconfig");
                Self::load_kubeconfig(options).await?
            }
        };

        config.read_timeout = Some(options.timeout);

        let client = Client::try_from(config).context("Failed to create Kubernetes client")?;

        info!(
            cluster = %identity.name,
            context = %identity.context,
            server = %identity.server,
            "Connected to cluster"
        );

        Ok(Self { client, identity })
    }

    async fn load_kubeconfig(options: &ConnectOptions) -> Result<(Config, ClusterIdentity)> {
        let kubeconfig = match &options.kubeconfig {
            Some(path) => Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to load kubeconfig {}", path.display()))?,
            None => Kubeconfig::read().context("Failed to load kubeconfig")?,
        };

        let mut identity = resolve_identity(&kubeconfig, options.context.as_deref());

        let kube_options = KubeConfigOptions {
            context: options.context.clone(),
            ..Default::default()
        };
        let config = Config::from_custom_kubeconfig(kubeconfig, &kube_options)
            .await
            .context("Failed to create REST config")?;

        identity.server = config.cluster_url.to_string();
        if identity.name.is_empty() {
            identity.name = identity.server.clone();
        }

        Ok((config, identity))
    }

    /// Identity of the connected cluster
    pub fn identity(&self) -> &ClusterIdentity {
        &self.identity
    }

    /// Probe the metrics API; an error usually means metrics-server is missing
    pub async fn check_usage_api(&self) -> Result<()> {
        let api: Api<NodeMetrics> = Api::all(self.client.clone());
        api.list(&ListParams::default().limit(1))
            .await
            .context("metrics API not available")?;
        Ok(())
    }
}

#[async_trait]
impl ResourceStateSource for KubeSource {
    async fn list_node_descriptors(&self) -> Result<Vec<NodeDescriptor>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(node_descriptor).collect())
    }

    async fn list_node_usage(&self) -> Result<HashMap<String, UsageSample>> {
        let api: Api<NodeMetrics> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|m| {
                let sample = usage_sample(&m.usage);
                m.metadata.name.map(|name| (name, sample))
            })
            .collect())
    }

    async fn list_workload_descriptors(&self) -> Result<Vec<WorkloadDescriptor>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(workload_descriptor).collect())
    }

    async fn list_workload_usage(&self) -> Result<HashMap<WorkloadKey, UsageSample>> {
        let api: Api<PodMetrics> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.iter().filter_map(pod_usage).collect())
    }
}

/// Resolve cluster name, context and namespace from a kubeconfig
pub(crate) fn resolve_identity(
    kubeconfig: &Kubeconfig,
    context_override: Option<&str>,
) -> ClusterIdentity {
    let context_name = context_override
        .map(str::to_string)
        .or_else(|| kubeconfig.current_context.clone())
        .unwrap_or_default();

    let mut identity = ClusterIdentity {
        context: context_name.clone(),
        ..Default::default()
    };

    if let Some(context) = kubeconfig
        .contexts
        .iter()
        .find(|named| named.name == context_name)
        .and_then(|named| named.context.as_ref())
    {
        identity.name = context.cluster.clone();
        identity.namespace = context.namespace.clone().unwrap_or_default();
    }

    identity
}

fn resource_amounts(list: Option<&BTreeMap<String, Quantity>>) -> ResourceAmounts {
    let Some(list) = list else {
        return ResourceAmounts::default();
    };

    ResourceAmounts {
        cpu_milli: list.get("cpu").map(quantity::cpu_milli).unwrap_or(0),
        memory_bytes: list.get("memory").map(quantity::whole_value).unwrap_or(0),
        ephemeral_storage_bytes: list.get("ephemeral-storage").map(quantity::whole_value),
        accelerator_count: list.get(ACCELERATOR_RESOURCE).map(quantity::whole_value),
    }
}

fn usage_sample(usage: &BTreeMap<String, Quantity>) -> UsageSample {
    UsageSample {
        cpu_milli: usage.get("cpu").map(quantity::cpu_milli).unwrap_or(0),
        memory_bytes: usage.get("memory").map(quantity::whole_value).unwrap_or(0),
    }
}

pub(crate) fn node_descriptor(node: &Node) -> NodeDescriptor {
    let status = node.status.as_ref();

    NodeDescriptor {
        name: node.metadata.name.clone().unwrap_or_default(),
        capacity: resource_amounts(status.and_then(|s| s.capacity.as_ref())),
        allocatable: resource_amounts(status.and_then(|s| s.allocatable.as_ref())),
        conditions: status
            .and_then(|s| s.conditions.as_ref())
            .map(|conditions| {
                conditions
                    .iter()
                    .map(|c| ConditionReport::new(c.type_.clone(), c.status == "True"))
                    .collect()
            })
            .unwrap_or_default(),
        labels: node.metadata.labels.clone().unwrap_or_default(),
    }
}

pub(crate) fn workload_descriptor(pod: &Pod) -> WorkloadDescriptor {
    let spec = pod.spec.as_ref();
    let status = pod.status.as_ref();

    WorkloadDescriptor {
        namespace: pod.metadata.namespace.clone().unwrap_or_default(),
        name: pod.metadata.name.clone().unwrap_or_default(),
        node_name: spec.and_then(|s| s.node_name.clone()).unwrap_or_default(),
        phase: status.and_then(|s| s.phase.clone()).unwrap_or_default(),
        container_count: spec.map(|s| s.containers.len()).unwrap_or(0),
        restart_counts: status
            .and_then(|s| s.container_statuses.as_ref())
            .map(|statuses| statuses.iter().map(|cs| cs.restart_count).collect())
            .unwrap_or_default(),
    }
}

pub(crate) fn pod_usage(metrics: &PodMetrics) -> Option<(WorkloadKey, UsageSample)> {
    let namespace = metrics.metadata.namespace.as_deref()?;
    let name = metrics.metadata.name.as_deref()?;

    let mut total = UsageSample::default();
    for container in &metrics.containers {
        total += usage_sample(&container.usage);
    }

    Some((WorkloadKey::new(namespace, name), total))
}
