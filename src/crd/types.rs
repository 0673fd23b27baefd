//! Supporting types for the MemberCluster CRD

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type that marks a member cluster's control plane as reachable
pub const CLUSTER_READY_CONDITION: &str = "Ready";

/// Condition status following Kubernetes conventions
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition reported on a member cluster
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCondition {
    /// Type of condition (e.g., Ready, Offline)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition was probed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_probe_time: Option<DateTime<Utc>>,

    /// Last time the condition transitioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl ClusterCondition {
    /// Create a new condition stamped with the current time
    pub fn new(type_: impl Into<String>, status: ConditionStatus) -> Self {
        let now = Utc::now();
        Self {
            type_: type_.into(),
            status,
            reason: None,
            message: None,
            last_probe_time: Some(now),
            last_transition_time: Some(now),
        }
    }

    /// Shorthand for a `Ready` condition with the given status
    pub fn ready(status: ConditionStatus) -> Self {
        Self::new(CLUSTER_READY_CONDITION, status)
    }
}

/// Reference to a Secret holding a member cluster's kubeconfig
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct SecretRef {
    /// Name of the Secret
    pub name: String,
    /// Namespace of the Secret
    pub namespace: String,
    /// Data key holding the kubeconfig; falls back to the controller default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}
