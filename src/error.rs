//! Error types for the Corral controller

use thiserror::Error;

/// Main error type for Corral operations
///
/// Every per-cluster variant carries the cluster name so a failure can be
/// logged and skipped without losing track of which cluster it belonged to.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// List/watch/get/update against the cluster source failed
    #[error("cluster source unavailable: {0}")]
    SourceUnavailable(String),

    /// Building a client for a member cluster failed
    #[error("failed to create client for cluster {cluster}: {message}")]
    ClientCreationFailed {
        /// Cluster the client was being created for
        cluster: String,
        /// Underlying failure
        message: String,
    },

    /// Stats were requested for a cluster with no cached client
    #[error("no client cached for cluster {0}")]
    NoClientForCluster(String),

    /// Stats were requested for a cluster whose Ready condition is not True
    #[error("cluster {0} is not ready")]
    ClusterNotReady(String),

    /// A capacity or pod query against a member cluster failed
    #[error("stats query failed for cluster {cluster}: {message}")]
    StatsQueryFailed {
        /// Cluster being queried
        cluster: String,
        /// Underlying failure
        message: String,
    },

    /// The store rejected an update (stale resource version or similar)
    #[error("update of cluster {cluster} rejected: {message}")]
    PersistConflict {
        /// Cluster being updated
        cluster: String,
        /// Underlying failure
        message: String,
    },

    /// Invalid controller configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a source-unavailable error with the given message
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Create a client-creation error for the given cluster
    pub fn client_creation(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ClientCreationFailed {
            cluster: cluster.into(),
            message: msg.into(),
        }
    }

    /// Create a stats-query error for the given cluster
    pub fn stats_query(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::StatsQueryFailed {
            cluster: cluster.into(),
            message: msg.into(),
        }
    }

    /// Create a persist-conflict error for the given cluster
    pub fn persist_conflict(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::PersistConflict {
            cluster: cluster.into(),
            message: msg.into(),
        }
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}
