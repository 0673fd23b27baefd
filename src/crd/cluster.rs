//! MemberCluster Custom Resource Definition
//!
//! A MemberCluster is one cluster registered with the federation. Its
//! annotations are the only place lifecycle state is persisted.

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{ClusterCondition, ConditionStatus, SecretRef, CLUSTER_READY_CONDITION};

/// Specification for a MemberCluster
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "corral.dev",
    version = "v1alpha1",
    kind = "MemberCluster",
    plural = "memberclusters",
    shortname = "mc",
    status = "MemberClusterStatus",
    namespaced = false,
    printcolumn = r#"{"name":"Server","type":"string","jsonPath":".spec.server"}"#,
    printcolumn = r#"{"name":"Lifecycle","type":"string","jsonPath":".metadata.annotations.corral\\.dev/lifecycle-state"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MemberClusterSpec {
    /// API server address of the member cluster
    pub server: String,

    /// Secret holding the kubeconfig used to reach the member cluster
    pub kubeconfig_secret_ref: SecretRef,
}

/// Status for a MemberCluster, written by the federation's health checker
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberClusterStatus {
    /// Conditions representing the member cluster's health
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ClusterCondition>,
}

impl MemberCluster {
    /// Returns true if the cluster reports `Ready=True`
    pub fn is_ready(&self) -> bool {
        is_cluster_ready(self)
    }

    /// Returns true if the cluster carries a deletion timestamp
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Value of a single annotation
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations().get(key).map(String::as_str)
    }
}

/// A cluster is ready iff it has a `Ready` condition whose status is `True`
pub fn is_cluster_ready(cluster: &MemberCluster) -> bool {
    cluster
        .status
        .as_ref()
        .map(|s| {
            s.conditions
                .iter()
                .any(|c| c.type_ == CLUSTER_READY_CONDITION && c.status == ConditionStatus::True)
        })
        .unwrap_or(false)
}
