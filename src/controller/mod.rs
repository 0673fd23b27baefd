//! Controller for federated member clusters
//!
//! This module contains the reconciliation engine and the watch and monitor
//! loops that drive it. The engine follows the observe-diff-act pattern:
//! it observes cluster records and pod capacity, diffs them against the
//! lifecycle annotations, and persists the annotations that changed.

mod reconciler;
mod runner;

pub use reconciler::{ChangeNotifier, EngineBuilder, ReconciliationEngine, SyncReport};
pub use runner::{run, spawn, ControllerHandle, EventDispatcher};
