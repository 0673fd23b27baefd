//! Loops that drive the reconciliation engine
//!
//! Two tasks share one engine:
//! 1. the watch loop, applying add/update/delete events as they arrive
//! 2. the monitor loop, running a full sync every monitor period as a safety
//!    net for missed events and to refresh capacity annotations
//!
//! Both stop when the cancellation token fires. A pass already in flight
//! finishes before the monitor task returns.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ReconciliationEngine;
use crate::crd::MemberCluster;
use crate::source::WatchEvent;

/// Delay before resuming after a watch error
const WATCH_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Handles to the spawned controller tasks
pub struct ControllerHandle {
    watch: JoinHandle<()>,
    monitor: JoinHandle<()>,
}

impl ControllerHandle {
    /// Wait for both loops to stop
    pub async fn join(self) {
        if let Err(e) = self.watch.await {
            warn!(error = %e, "Watch loop task failed");
        }
        if let Err(e) = self.monitor.await {
            warn!(error = %e, "Monitor loop task failed");
        }
    }
}

/// Spawn the watch and monitor loops
pub fn spawn(
    engine: Arc<ReconciliationEngine>,
    monitor_period: Duration,
    cancel: CancellationToken,
) -> ControllerHandle {
    let watch = tokio::spawn(run_watch_loop(engine.clone(), cancel.clone()));
    let monitor = tokio::spawn(run_monitor_loop(engine, monitor_period, cancel));
    ControllerHandle { watch, monitor }
}

/// Run both loops until `cancel` fires
pub async fn run(engine: Arc<ReconciliationEngine>, monitor_period: Duration, cancel: CancellationToken) {
    spawn(engine, monitor_period, cancel).join().await;
}

/// Turns watch events into engine calls
///
/// Keeps the last object seen per name so a modification can be handed to
/// the engine together with its previous version.
#[derive(Default)]
pub struct EventDispatcher {
    last_seen: HashMap<String, MemberCluster>,
}

impl EventDispatcher {
    /// Create a dispatcher with no history
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event to the engine
    pub async fn dispatch(&mut self, engine: &ReconciliationEngine, event: WatchEvent) {
        let name = event.name();
        match event {
            WatchEvent::Added(cluster) => {
                engine.on_add(&cluster).await;
                self.last_seen.insert(name, cluster);
            }
            WatchEvent::Modified(cluster) => {
                match self.last_seen.get(&name) {
                    Some(old) => engine.on_update(old, &cluster).await,
                    None => engine.on_add(&cluster).await,
                }
                if cluster.is_being_deleted() {
                    self.last_seen.remove(&name);
                } else {
                    self.last_seen.insert(name, cluster);
                }
            }
            WatchEvent::Deleted(_) => {
                self.last_seen.remove(&name);
                engine.on_delete(&name).await;
            }
        }
    }
}

async fn run_watch_loop(engine: Arc<ReconciliationEngine>, cancel: CancellationToken) {
    let mut dispatcher = EventDispatcher::new();
    info!("Cluster watch loop started");

    loop {
        let mut stream = engine.watch();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Cluster watch loop stopped");
                    return;
                }
                next = stream.next() => match next {
                    Some(Ok(event)) => dispatcher.dispatch(&engine, event).await,
                    Some(Err(e)) => {
                        warn!(error = %e, "Cluster watch error, will retry");
                        tokio::select! {
                            _ = cancel.cancelled() => return,
                            _ = tokio::time::sleep(WATCH_ERROR_BACKOFF) => {}
                        }
                    }
                    None => {
                        warn!("Cluster watch stream ended, reopening");
                        break;
                    }
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(WATCH_ERROR_BACKOFF) => {}
        }
    }
}

async fn run_monitor_loop(
    engine: Arc<ReconciliationEngine>,
    period: Duration,
    cancel: CancellationToken,
) {
    // First tick completes immediately, so the initial pass runs at startup
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(period_secs = period.as_secs(), "Cluster monitor loop started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                debug!("Running periodic full sync");
                if let Err(e) = engine.full_sync().await {
                    warn!(error = %e, "Periodic full sync failed");
                }
            }
        }
    }
    info!("Cluster monitor loop stopped");
}
