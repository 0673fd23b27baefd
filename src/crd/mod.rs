//! Custom Resource Definitions for Corral
//!
//! This module contains the MemberCluster CRD the controller reconciles.

mod cluster;
mod types;

pub use cluster::{is_cluster_ready, MemberCluster, MemberClusterSpec, MemberClusterStatus};
pub use types::{ClusterCondition, ConditionStatus, SecretRef, CLUSTER_READY_CONDITION};
