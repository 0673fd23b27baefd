//! Member cluster clients
//!
//! A [`ClusterClient`] answers the handful of capacity queries the controller
//! needs from one member cluster. Clients are built by a
//! [`ClusterClientFactory`] and memoized per cluster name in a
//! [`ClusterClientCache`]; [`CapacityStatsCollector`] turns a cached client
//! into a [`MetricsSnapshot`](crate::lifecycle::MetricsSnapshot).

mod cache;
mod kubernetes;
mod stats;

use std::sync::Arc;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::crd::MemberCluster;
use crate::Error;

pub use cache::ClusterClientCache;
pub use kubernetes::{KubeClusterClient, KubeClusterClientFactory};
pub use stats::CapacityStatsCollector;

/// Shared handle to a member cluster client
pub type ClusterClientHandle = Arc<dyn ClusterClient>;

/// Pod capacity of a member cluster, summed over its nodes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PodCapacity {
    /// Pod slots available for scheduling
    pub allocatable: u64,
    /// Total pod slots
    pub total: u64,
}

/// Which namespaces a pod count covers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamespaceFilter {
    /// Every namespace
    All,
    /// A single namespace
    Only(String),
}

/// A pod count request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodQuery {
    /// Namespaces to count in
    pub namespaces: NamespaceFilter,
    /// Count only Pending and Running pods
    pub active_only: bool,
}

impl PodQuery {
    /// Pending and Running pods across every namespace
    pub fn active_everywhere() -> Self {
        Self {
            namespaces: NamespaceFilter::All,
            active_only: true,
        }
    }

    /// Every pod in `namespace`, regardless of phase
    pub fn all_in(namespace: impl Into<String>) -> Self {
        Self {
            namespaces: NamespaceFilter::Only(namespace.into()),
            active_only: false,
        }
    }
}

/// Queries against a single member cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Allocatable and total pod capacity
    async fn pod_capacity(&self) -> Result<PodCapacity, Error>;

    /// Number of pods matching `query`
    async fn count_pods(&self, query: &PodQuery) -> Result<u64, Error>;
}

/// Builds clients for member clusters
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClientFactory: Send + Sync {
    /// Build a client for `cluster`
    async fn create(&self, cluster: &MemberCluster) -> Result<ClusterClientHandle, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_everywhere_counts_running_and_pending() {
        let query = PodQuery::active_everywhere();
        assert_eq!(query.namespaces, NamespaceFilter::All);
        assert!(query.active_only);
    }

    #[test]
    fn reserved_namespace_query_counts_every_phase() {
        let query = PodQuery::all_in("kube-system");
        assert_eq!(query.namespaces, NamespaceFilter::Only("kube-system".into()));
        assert!(!query.active_only);
    }
}
