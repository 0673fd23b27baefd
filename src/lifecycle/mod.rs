//! Cluster lifecycle state machine
//!
//! Lifecycle state is persisted only in MemberCluster annotations. This
//! module owns the annotation vocabulary, the typed [`LifecycleState`], and
//! the pure [`evaluate`] function that decides how a pass changes them.

pub mod annotations;
mod decision;
mod state;

pub use decision::{evaluate, Decision, LifecycleAction, LifecyclePolicy, MetricsSnapshot};
pub use state::{set_state, LifecycleState, StateAnnotation};
