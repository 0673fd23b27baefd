//! Corral - lifecycle controller for federated member clusters
//!
//! Corral keeps every member cluster of a federation annotated with a
//! capacity-aware lifecycle state that downstream components act on.
//!
//! # Architecture
//!
//! Two schedules drive a single [`controller::ReconciliationEngine`]:
//! - a watch loop that applies add/update/delete events as they arrive
//! - a monitor timer that runs a full list-and-evaluate pass
//!
//! Each pass samples pod capacity from every ready cluster and feeds the
//! numbers into a pure annotation state machine ([`lifecycle`]) that decides
//! whether a cluster should scale up, scale down, or be shut down once idle.
//!
//! # Modules
//!
//! - [`crd`] - MemberCluster Custom Resource Definition
//! - [`lifecycle`] - Lifecycle states, annotation keys, and the decision engine
//! - [`source`] - Cluster record source (list/watch/get/update)
//! - [`client`] - Per-cluster clients, the client cache, and stats collection
//! - [`controller`] - Reconciliation engine and the loops that drive it
//! - [`config`] - Controller configuration
//! - [`telemetry`] - Logging initialization
//! - [`timeout`] - Deadlines for remote calls
//! - [`locks`] - Per-key async locks
//! - [`error`] - Error types for the controller

#![deny(missing_docs)]

pub mod client;
pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod lifecycle;
pub mod locks;
pub mod source;
pub mod telemetry;
pub mod timeout;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Default interval between full reconciliation passes, in seconds
pub const DEFAULT_MONITOR_PERIOD_SECS: u64 = 40;

/// Default idle time before an empty cluster is marked for shutdown, in seconds
pub const DEFAULT_TIME_TO_LIVE_SECS: i64 = 600;

/// Default user-pod utilisation (percent) at or above which a cluster scales up
pub const DEFAULT_SCALE_UP_THRESHOLD_PERCENT: i64 = 80;

/// Default user-pod utilisation (percent) at or below which a cluster scales down
pub const DEFAULT_SCALE_DOWN_THRESHOLD_PERCENT: i64 = 20;

/// Default timeout applied to every remote call, in seconds
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// Default number of clusters evaluated concurrently during a pass
pub const DEFAULT_MAX_CONCURRENT_SYNCS: usize = 8;

/// Field manager name used for writes to the federation store
pub const FIELD_MANAGER: &str = "corral-controller";
