//! Per-cluster client cache

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use kube::ResourceExt;
use tracing::{debug, info};

use super::{ClusterClientFactory, ClusterClientHandle};
use crate::crd::MemberCluster;
use crate::locks::KeyedLocks;
use crate::timeout::with_timeout;
use crate::Error;

/// Lazily built client handles, one per cluster name
///
/// Creation for a name is serialized so concurrent `ensure` calls build at
/// most one client. Waiters that lose the race pick up the handle the winner
/// stored.
pub struct ClusterClientCache {
    factory: Arc<dyn ClusterClientFactory>,
    clients: DashMap<String, ClusterClientHandle>,
    creation: KeyedLocks,
    call_timeout: Duration,
}

impl ClusterClientCache {
    /// Create an empty cache that builds clients with `factory`
    pub fn new(factory: Arc<dyn ClusterClientFactory>, call_timeout: Duration) -> Self {
        Self {
            factory,
            clients: DashMap::new(),
            creation: KeyedLocks::new(),
            call_timeout,
        }
    }

    /// Return the cached client for `cluster`, building one if needed
    ///
    /// On failure nothing is cached and the next call retries.
    pub async fn ensure(&self, cluster: &MemberCluster) -> Result<ClusterClientHandle, Error> {
        let name = cluster.name_any();
        if let Some(existing) = self.get(&name) {
            return Ok(existing);
        }

        let guard = self.creation.lock(&name).await;
        if let Some(existing) = self.get(&name) {
            return Ok(existing);
        }

        let created = with_timeout(
            self.call_timeout,
            "create cluster client",
            self.factory.create(cluster),
            |msg| Error::client_creation(&name, msg),
        )
        .await
        .map_err(|e| match e {
            Error::ClientCreationFailed { .. } => e,
            other => Error::client_creation(&name, other.to_string()),
        });

        let result = created.map(|client| {
            self.clients.insert(name.clone(), client.clone());
            info!(cluster = %name, "Created member cluster client");
            client
        });

        drop(guard);
        self.creation.forget(&name);
        result
    }

    /// Cached client for `name`, if any
    pub fn get(&self, name: &str) -> Option<ClusterClientHandle> {
        self.clients.get(name).map(|entry| entry.value().clone())
    }

    /// Drop the cached client for `name`; returns true if one was cached
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.clients.remove(name).is_some();
        if removed {
            debug!(cluster = %name, "Dropped member cluster client");
        }
        removed
    }

    /// Returns true if a client is cached for `name`
    pub fn contains(&self, name: &str) -> bool {
        self.clients.contains_key(name)
    }

    /// Number of cached clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no client is cached
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
