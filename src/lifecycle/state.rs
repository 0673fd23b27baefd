//! Lifecycle states carried in the `lifecycle-state` annotation

use std::collections::BTreeMap;

use super::annotations::LIFECYCLE_STATE;

/// Lifecycle state of a member cluster
///
/// Only this controller (scale/shutdown marks) and an external actor
/// (Ready/Offline flips, clearing Pending/Scaling states) write it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Cluster accepts workloads and is evaluated every pass
    Ready,
    /// Utilisation hit the scale-up threshold; waiting for the provisioner
    PendingScaleUp,
    /// Provisioner is adding capacity
    ScalingUp,
    /// Utilisation fell to the scale-down threshold; waiting for the provisioner
    PendingScaleDown,
    /// Provisioner is removing capacity
    ScalingDown,
    /// Idle TTL expired; waiting for the provisioner to shut the cluster down
    PendingShutdown,
    /// Cluster is shut down
    Offline,
}

impl LifecycleState {
    /// Annotation value for this state
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::PendingScaleUp => "PendingScaleUp",
            Self::ScalingUp => "ScalingUp",
            Self::PendingScaleDown => "PendingScaleDown",
            Self::ScalingDown => "ScalingDown",
            Self::PendingShutdown => "PendingShutdown",
            Self::Offline => "Offline",
        }
    }

    /// Returns true while a scale operation is requested or in progress
    pub fn is_scaling(&self) -> bool {
        matches!(
            self,
            Self::PendingScaleUp | Self::ScalingUp | Self::PendingScaleDown | Self::ScalingDown
        )
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LifecycleState {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ready" => Ok(Self::Ready),
            "PendingScaleUp" => Ok(Self::PendingScaleUp),
            "ScalingUp" => Ok(Self::ScalingUp),
            "PendingScaleDown" => Ok(Self::PendingScaleDown),
            "ScalingDown" => Ok(Self::ScalingDown),
            "PendingShutdown" => Ok(Self::PendingShutdown),
            "Offline" => Ok(Self::Offline),
            _ => Err(crate::Error::serialization(format!(
                "unknown lifecycle state: {s}"
            ))),
        }
    }
}

/// What the `lifecycle-state` annotation of a cluster currently says
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateAnnotation {
    /// Annotation not set: the cluster is not managed yet
    Absent,
    /// Annotation holds a known state
    Known(LifecycleState),
    /// Annotation holds something else; never treated as Ready
    Unrecognized(String),
}

impl StateAnnotation {
    /// Read the state annotation from an annotation map
    pub fn read(annotations: &BTreeMap<String, String>) -> Self {
        match annotations.get(LIFECYCLE_STATE) {
            None => Self::Absent,
            Some(raw) => match raw.parse() {
                Ok(state) => Self::Known(state),
                Err(_) => Self::Unrecognized(raw.clone()),
            },
        }
    }

    /// Returns true if the annotation holds exactly `state`
    pub fn is(&self, state: LifecycleState) -> bool {
        matches!(self, Self::Known(s) if *s == state)
    }

    /// Returns true if the annotation is not set
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns true if the cluster is managed and scaling
    pub fn is_scaling(&self) -> bool {
        matches!(self, Self::Known(s) if s.is_scaling())
    }
}

impl std::fmt::Display for StateAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => Ok(()),
            Self::Known(state) => write!(f, "{state}"),
            Self::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

/// Write a lifecycle state into an annotation map
pub fn set_state(annotations: &mut BTreeMap<String, String>, state: LifecycleState) {
    annotations.insert(LIFECYCLE_STATE.to_string(), state.as_str().to_string());
}
