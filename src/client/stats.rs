//! Capacity sampling for member clusters

use std::sync::Arc;
use std::time::Duration;

use kube::ResourceExt;
use tracing::{debug, instrument};

use super::{ClusterClientCache, ClusterClientHandle, PodQuery};
use crate::crd::MemberCluster;
use crate::lifecycle::MetricsSnapshot;
use crate::timeout::with_timeout;
use crate::Error;

/// Samples pod capacity and usage from a cluster's cached client
pub struct CapacityStatsCollector {
    cache: Arc<ClusterClientCache>,
    reserved_namespaces: Vec<String>,
    call_timeout: Duration,
}

impl CapacityStatsCollector {
    /// Create a collector reading clients from `cache`
    ///
    /// Pods in `reserved_namespaces` are counted as system pods.
    pub fn new(
        cache: Arc<ClusterClientCache>,
        reserved_namespaces: Vec<String>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            reserved_namespaces,
            call_timeout,
        }
    }

    /// Take a fresh snapshot of `cluster`
    ///
    /// The cluster must have a cached client and report Ready. The first
    /// failing query aborts the whole snapshot.
    #[instrument(skip(self, cluster), fields(cluster = %cluster.name_any()))]
    pub async fn collect(&self, cluster: &MemberCluster) -> Result<MetricsSnapshot, Error> {
        let name = cluster.name_any();
        let client = self
            .cache
            .get(&name)
            .ok_or_else(|| Error::NoClientForCluster(name.clone()))?;
        if !cluster.is_ready() {
            return Err(Error::ClusterNotReady(name));
        }

        let capacity = self
            .query(&name, "query pod capacity", client.pod_capacity())
            .await?;

        let used_pods = self
            .count(&name, &client, PodQuery::active_everywhere())
            .await?;

        let mut used_system_pods = 0;
        for namespace in &self.reserved_namespaces {
            used_system_pods += self
                .count(&name, &client, PodQuery::all_in(namespace.as_str()))
                .await?;
        }

        let snapshot = MetricsSnapshot {
            allocatable_pods: capacity.allocatable,
            total_pods: capacity.total,
            used_pods,
            used_system_pods,
        };
        debug!(
            allocatable = snapshot.allocatable_pods,
            total = snapshot.total_pods,
            used = snapshot.used_pods,
            system = snapshot.used_system_pods,
            "Collected capacity snapshot"
        );
        Ok(snapshot)
    }

    async fn count(
        &self,
        cluster: &str,
        client: &ClusterClientHandle,
        query: PodQuery,
    ) -> Result<u64, Error> {
        self.query(cluster, "count pods", client.count_pods(&query))
            .await
    }

    async fn query<T>(
        &self,
        cluster: &str,
        operation: &str,
        call: impl std::future::Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        with_timeout(self.call_timeout, operation, call, |msg| {
            Error::stats_query(cluster, msg)
        })
        .await
        .map_err(|e| match e {
            Error::StatsQueryFailed { .. } => e,
            other => Error::stats_query(cluster, other.to_string()),
        })
    }
}
