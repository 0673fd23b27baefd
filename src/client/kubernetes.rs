//! kube-rs backed member cluster clients
//!
//! The factory reads the kubeconfig Secret named by a MemberCluster from the
//! federation (hub) cluster and builds a `kube::Client` for the member. The
//! member client answers capacity queries from `Node` and `Pod` lists.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod, Secret};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, ResourceExt};
use tracing::{debug, warn};

use super::{
    ClusterClient, ClusterClientFactory, ClusterClientHandle, NamespaceFilter, PodCapacity,
    PodQuery,
};
use crate::crd::MemberCluster;
use crate::Error;

/// Pod phases counted as occupying a slot
const ACTIVE_POD_PHASES: [&str; 2] = ["Pending", "Running"];

/// Node resource name for pod slots
const PODS_RESOURCE: &str = "pods";

/// Builds member cluster clients from kubeconfig Secrets on the hub
pub struct KubeClusterClientFactory {
    hub: Client,
    default_secret_key: String,
}

impl KubeClusterClientFactory {
    /// Create a factory reading Secrets through `hub`
    ///
    /// `default_secret_key` is the Secret data key used when the cluster's
    /// secret reference does not name one.
    pub fn new(hub: Client, default_secret_key: impl Into<String>) -> Self {
        Self {
            hub,
            default_secret_key: default_secret_key.into(),
        }
    }

    async fn read_kubeconfig(&self, cluster: &MemberCluster) -> Result<String, Error> {
        let name = cluster.name_any();
        let secret_ref = &cluster.spec.kubeconfig_secret_ref;
        let key = secret_ref
            .key
            .as_deref()
            .unwrap_or(&self.default_secret_key);

        let secrets: Api<Secret> = Api::namespaced(self.hub.clone(), &secret_ref.namespace);
        let secret = secrets.get(&secret_ref.name).await.map_err(|e| {
            Error::client_creation(
                &name,
                format!(
                    "read secret {}/{}: {e}",
                    secret_ref.namespace, secret_ref.name
                ),
            )
        })?;

        let bytes = secret
            .data
            .as_ref()
            .and_then(|data| data.get(key))
            .ok_or_else(|| {
                Error::client_creation(
                    &name,
                    format!(
                        "secret {}/{} has no key {key}",
                        secret_ref.namespace, secret_ref.name
                    ),
                )
            })?;

        String::from_utf8(bytes.0.clone())
            .map_err(|e| Error::client_creation(&name, format!("kubeconfig is not UTF-8: {e}")))
    }
}

#[async_trait]
impl ClusterClientFactory for KubeClusterClientFactory {
    async fn create(&self, cluster: &MemberCluster) -> Result<ClusterClientHandle, Error> {
        let name = cluster.name_any();
        let raw = self.read_kubeconfig(cluster).await?;

        let kubeconfig = Kubeconfig::from_yaml(&raw)
            .map_err(|e| Error::client_creation(&name, format!("parse kubeconfig: {e}")))?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| Error::client_creation(&name, format!("load kubeconfig: {e}")))?;
        debug!(cluster = %name, url = %config.cluster_url, "Loaded member kubeconfig");

        let client = Client::try_from(config)
            .map_err(|e| Error::client_creation(&name, format!("build client: {e}")))?;

        Ok(Arc::new(KubeClusterClient::new(name, client)))
    }
}

/// Capacity queries against one member cluster's API server
pub struct KubeClusterClient {
    cluster: String,
    client: Client,
}

impl KubeClusterClient {
    /// Wrap a client already pointed at the member cluster
    pub fn new(cluster: impl Into<String>, client: Client) -> Self {
        Self {
            cluster: cluster.into(),
            client,
        }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn pod_capacity(&self) -> Result<PodCapacity, Error> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let nodes = nodes.list(&ListParams::default()).await?;

        Ok(sum_pod_capacity(&self.cluster, &nodes.items))
    }

    async fn count_pods(&self, query: &PodQuery) -> Result<u64, Error> {
        let pods: Api<Pod> = match &query.namespaces {
            NamespaceFilter::All => Api::all(self.client.clone()),
            NamespaceFilter::Only(ns) => Api::namespaced(self.client.clone(), ns),
        };
        let pods = pods.list(&ListParams::default()).await?;

        Ok(count_matching(&pods.items, query.active_only))
    }
}

fn sum_pod_capacity(cluster: &str, nodes: &[Node]) -> PodCapacity {
    let mut capacity = PodCapacity::default();
    for node in nodes {
        let Some(status) = node.status.as_ref() else {
            continue;
        };
        let node_name = node.name_any();
        if let Some(q) = status.allocatable.as_ref().and_then(|m| m.get(PODS_RESOURCE)) {
            capacity.allocatable = capacity
                .allocatable
                .saturating_add(pod_slots(cluster, &node_name, q));
        }
        if let Some(q) = status.capacity.as_ref().and_then(|m| m.get(PODS_RESOURCE)) {
            capacity.total = capacity
                .total
                .saturating_add(pod_slots(cluster, &node_name, q));
        }
    }
    capacity
}

fn pod_slots(cluster: &str, node: &str, quantity: &Quantity) -> u64 {
    match parse_pod_quantity(quantity) {
        Some(slots) => slots,
        None => {
            warn!(cluster = %cluster, node = %node, quantity = %quantity.0, "Unparseable pod quantity");
            0
        }
    }
}

/// Parse a pod-count quantity; accepts plain integers and the `k` suffix
fn parse_pod_quantity(quantity: &Quantity) -> Option<u64> {
    let raw = quantity.0.trim();
    if let Some(thousands) = raw.strip_suffix('k') {
        return thousands
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(1000));
    }
    raw.parse::<u64>().ok()
}

fn count_matching(pods: &[Pod], active_only: bool) -> u64 {
    pods.iter()
        .filter(|pod| !active_only || is_active(pod))
        .count() as u64
}

fn is_active(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(|phase| ACTIVE_POD_PHASES.contains(&phase))
        .unwrap_or(false)
}
