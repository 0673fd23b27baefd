//! Cluster record source
//!
//! The controller never talks to the federation store directly; it goes
//! through [`ClusterSource`], which lists, watches, fetches, and updates
//! MemberCluster records. [`KubeClusterSource`] is the kube-rs backed
//! implementation used by the binary.

mod kubernetes;

use async_trait::async_trait;
use futures::stream::BoxStream;
use kube::ResourceExt;

#[cfg(test)]
use mockall::automock;

use crate::crd::MemberCluster;
use crate::Error;

pub use kubernetes::KubeClusterSource;

/// A change delivered by the watch stream
#[derive(Clone, Debug)]
pub enum WatchEvent {
    /// Cluster seen for the first time (initial listing)
    Added(MemberCluster),
    /// Cluster created or changed after the initial listing
    Modified(MemberCluster),
    /// Cluster removed from the store
    Deleted(MemberCluster),
}

impl WatchEvent {
    /// The cluster carried by this event
    pub fn cluster(&self) -> &MemberCluster {
        match self {
            Self::Added(c) | Self::Modified(c) | Self::Deleted(c) => c,
        }
    }

    /// Name of the cluster carried by this event
    pub fn name(&self) -> String {
        self.cluster().name_any()
    }
}

/// Stream of watch events; errors are transient and the stream keeps going
pub type WatchStream = BoxStream<'static, Result<WatchEvent, Error>>;

/// Trait abstracting the federation store for MemberCluster records
///
/// This trait allows mocking the store in tests while using the real
/// Kubernetes API in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterSource: Send + Sync {
    /// List every cluster currently in the store
    async fn list(&self) -> Result<Vec<MemberCluster>, Error>;

    /// Open a watch over all clusters
    fn watch(&self) -> WatchStream;

    /// Fetch the current server-side record of one cluster
    async fn get(&self, name: &str) -> Result<MemberCluster, Error>;

    /// Replace a cluster record, returning what the store persisted
    ///
    /// Fails with [`Error::PersistConflict`] if the record changed since it
    /// was read.
    async fn update(&self, cluster: &MemberCluster) -> Result<MemberCluster, Error>;
}
