//! Reconciliation engine for member clusters
//!
//! The engine owns the set of clusters it has observed and the client cache.
//! Watch events adjust both incrementally; [`ReconciliationEngine::full_sync`]
//! re-lists everything, reconciles drift left by missed events, and runs the
//! lifecycle decision engine against every ready cluster.
//!
//! Work on a single cluster is serialized by a per-name lock, shared between
//! the watch handlers and the per-cluster step of a full sync. Distinct
//! clusters are processed concurrently.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashSet;
use futures::StreamExt;
use kube::{Client, ResourceExt};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::client::{
    CapacityStatsCollector, ClusterClientCache, ClusterClientFactory, ClusterClientHandle,
    KubeClusterClientFactory,
};
use crate::config::ControllerConfig;
use crate::crd::MemberCluster;
use crate::lifecycle::{evaluate, LifecyclePolicy, LifecycleState, StateAnnotation};
use crate::locks::KeyedLocks;
use crate::source::{ClusterSource, KubeClusterSource, WatchStream};
use crate::timeout::with_timeout;
use crate::Error;

/// Callback fired after a cluster is added, removed, or re-annotated
pub type ChangeNotifier = Arc<dyn Fn() + Send + Sync>;

/// Counts from one full sync
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// False when the call found another pass in progress and did nothing
    pub ran: bool,
    /// Clusters returned by the source
    pub listed: usize,
    /// Clusters seen for the first time during this pass
    pub added: usize,
    /// Known clusters missing from the listing
    pub deleted: usize,
    /// Clusters the decision engine ran against
    pub evaluated: usize,
    /// Clusters whose annotations were persisted
    pub updated: usize,
    /// Clusters skipped: not ready, deleting, or failed mid-step
    pub skipped: usize,
}

impl SyncReport {
    fn already_running() -> Self {
        Self::default()
    }
}

/// Result of the per-cluster step of a full sync
#[derive(Debug, PartialEq, Eq)]
enum ClusterOutcome {
    Unchanged,
    Updated,
    Skipped,
}

/// Drives client caching, stats collection, and lifecycle annotations
///
/// Use [`EngineBuilder`] to construct instances:
///
/// ```ignore
/// let engine = ReconciliationEngine::builder(source, factory)
///     .config(&config)
///     .on_change(Arc::new(|| tracing::debug!("cluster changed")))
///     .build();
/// ```
pub struct ReconciliationEngine {
    source: Arc<dyn ClusterSource>,
    cache: Arc<ClusterClientCache>,
    collector: CapacityStatsCollector,
    policy: LifecyclePolicy,
    call_timeout: Duration,
    max_concurrent_syncs: usize,
    known: DashSet<String>,
    cluster_locks: KeyedLocks,
    sync_guard: Mutex<()>,
    synced: AtomicBool,
    on_change: RwLock<Option<ChangeNotifier>>,
}

impl ReconciliationEngine {
    /// Create a builder over the given collaborators
    pub fn builder(
        source: Arc<dyn ClusterSource>,
        factory: Arc<dyn ClusterClientFactory>,
    ) -> EngineBuilder {
        EngineBuilder::new(source, factory)
    }

    /// Create an engine backed by the Kubernetes API
    ///
    /// This is a convenience method wiring [`KubeClusterSource`] and
    /// [`KubeClusterClientFactory`] over `client`.
    pub fn new(client: Client, config: &ControllerConfig) -> Self {
        let source = Arc::new(KubeClusterSource::new(client.clone()));
        let factory = Arc::new(KubeClusterClientFactory::new(
            client,
            config.kubeconfig_secret_key.clone(),
        ));
        Self::builder(source, factory).config(config).build()
    }

    /// Create an engine for testing with default settings
    #[cfg(test)]
    pub fn for_testing(
        source: Arc<dyn ClusterSource>,
        factory: Arc<dyn ClusterClientFactory>,
    ) -> Self {
        Self::builder(source, factory)
            .call_timeout(Duration::from_secs(1))
            .build()
    }

    /// Register the change notification, replacing any previous one
    pub fn set_on_change(&self, callback: ChangeNotifier) {
        if let Ok(mut slot) = self.on_change.write() {
            *slot = Some(callback);
        }
    }

    /// Returns true once a full sync has completed
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Sorted names of every cluster the engine currently knows about
    pub fn known_clusters(&self) -> Vec<String> {
        let mut names: Vec<String> = self.known.iter().map(|n| n.key().clone()).collect();
        names.sort();
        names
    }

    /// Returns true if a client is cached for `name`
    pub fn has_client(&self, name: &str) -> bool {
        self.cache.contains(name)
    }

    // =========================================================================
    // Watch handlers
    // =========================================================================

    /// Open a watch over the cluster source
    pub fn watch(&self) -> WatchStream {
        self.source.watch()
    }

    /// Handle a cluster seen for the first time
    ///
    /// The client is created eagerly unless the cluster carries a lifecycle
    /// state other than Ready. Creation failures are logged; the next full
    /// sync retries.
    pub async fn on_add(&self, cluster: &MemberCluster) {
        let name = cluster.name_any();
        let _guard = self.cluster_locks.lock(&name).await;
        self.add_locked(&name, cluster).await;
    }

    /// Handle a change to a cluster record
    pub async fn on_update(&self, old: &MemberCluster, new: &MemberCluster) {
        let name = new.name_any();
        let guard = self.cluster_locks.lock(&name).await;

        if new.is_being_deleted() {
            self.delete_locked(&name);
            drop(guard);
            self.cluster_locks.forget(&name);
            return;
        }

        if self.known.insert(name.clone()) {
            debug!(cluster = %name, "Cluster became known through an update");
            self.notify();
        }

        let before = StateAnnotation::read(old.annotations());
        let after = StateAnnotation::read(new.annotations());

        if after.is(LifecycleState::Ready) && !before.is(LifecycleState::Ready) {
            if self.cache.contains(&name) {
                return;
            }
            info!(cluster = %name, from = %before, "Cluster became Ready, creating client");
            if let Err(e) = self.cache.ensure(new).await {
                warn!(cluster = %name, error = %e, "Failed to create client for Ready cluster");
            }
        } else if after.is(LifecycleState::Offline) && self.cache.remove(&name) {
            info!(cluster = %name, "Cluster went Offline, dropped its client");
        }
    }

    /// Handle a cluster removed from the store
    pub async fn on_delete(&self, name: &str) {
        let guard = self.cluster_locks.lock(name).await;
        self.delete_locked(name);
        drop(guard);
        self.cluster_locks.forget(name);
    }

    async fn add_locked(&self, name: &str, cluster: &MemberCluster) {
        if self.known.insert(name.to_string()) {
            info!(cluster = %name, "Observed new cluster");
            self.notify();
        }

        if wants_client(cluster) {
            if let Err(e) = self.cache.ensure(cluster).await {
                warn!(cluster = %name, error = %e, "Failed to create client for new cluster");
            }
        } else {
            let state = StateAnnotation::read(cluster.annotations());
            info!(cluster = %name, state = %state, "Cluster not Ready, deferring client creation");
        }
    }

    fn delete_locked(&self, name: &str) {
        info!(cluster = %name, "Observed cluster deletion");
        self.known.remove(name);
        self.cache.remove(name);
        self.notify();
    }

    fn notify(&self) {
        let callback = self
            .on_change
            .read()
            .ok()
            .and_then(|slot| slot.as_ref().cloned());
        if let Some(callback) = callback {
            callback();
        }
    }

    // =========================================================================
    // Periodic pass
    // =========================================================================

    /// List every cluster, reconcile drift, and evaluate ready clusters
    ///
    /// Only a failed listing aborts the pass; every per-cluster failure is
    /// logged and the cluster is skipped until the next pass. A call made
    /// while another pass is running returns immediately with `ran == false`.
    #[instrument(skip(self))]
    pub async fn full_sync(&self) -> Result<SyncReport, Error> {
        let Ok(_pass) = self.sync_guard.try_lock() else {
            debug!("Full sync already in progress, skipping");
            return Ok(SyncReport::already_running());
        };

        let listed = match self.list().await {
            Ok(clusters) => clusters,
            Err(e) => {
                error!(error = %e, "Failed to list clusters, skipping pass");
                return Err(e);
            }
        };

        let mut report = SyncReport {
            ran: true,
            listed: listed.len(),
            ..Default::default()
        };

        for cluster in &listed {
            let name = cluster.name_any();
            if !self.known.contains(&name) {
                self.on_add(cluster).await;
                report.added += 1;
            }
        }

        if self.known.len() != listed.len() {
            let observed: BTreeSet<String> = listed.iter().map(|c| c.name_any()).collect();
            let missing: Vec<String> = self
                .known
                .iter()
                .map(|n| n.key().clone())
                .filter(|n| !observed.contains(n))
                .collect();
            for name in missing {
                self.on_delete(&name).await;
                report.deleted += 1;
            }
        }

        let (candidates, not_ready): (Vec<_>, Vec<_>) = listed
            .into_iter()
            .partition(|c| !c.is_being_deleted() && c.is_ready());
        report.skipped += not_ready.len();
        for cluster in &not_ready {
            debug!(cluster = %cluster.name_any(), "Cluster not Ready or deleting, skipping stats");
        }

        let outcomes: Vec<ClusterOutcome> = futures::stream::iter(candidates)
            .map(|cluster| self.sync_cluster(cluster))
            .buffer_unordered(self.max_concurrent_syncs)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                ClusterOutcome::Unchanged => report.evaluated += 1,
                ClusterOutcome::Updated => {
                    report.evaluated += 1;
                    report.updated += 1;
                }
                ClusterOutcome::Skipped => report.skipped += 1,
            }
        }

        self.synced.store(true, Ordering::Release);
        info!(
            listed = report.listed,
            added = report.added,
            deleted = report.deleted,
            evaluated = report.evaluated,
            updated = report.updated,
            skipped = report.skipped,
            "Full sync complete"
        );
        Ok(report)
    }

    async fn sync_cluster(&self, cluster: MemberCluster) -> ClusterOutcome {
        let name = cluster.name_any();
        let _guard = self.cluster_locks.lock(&name).await;

        // A watch delete may have landed between the listing and this step
        if !self.known.contains(&name) {
            debug!(cluster = %name, "Cluster deleted since listing, skipping");
            return ClusterOutcome::Skipped;
        }

        if wants_client(&cluster) {
            if let Err(e) = self.cache.ensure(&cluster).await {
                warn!(cluster = %name, error = %e, "No client for cluster, skipping stats");
                return ClusterOutcome::Skipped;
            }
        }

        let snapshot = match self.collector.collect(&cluster).await {
            Ok(snapshot) => snapshot,
            Err(Error::NoClientForCluster(_)) => {
                debug!(cluster = %name, "No client cached for cluster, skipping stats");
                return ClusterOutcome::Skipped;
            }
            Err(e) => {
                warn!(cluster = %name, error = %e, "Failed to collect stats");
                return ClusterOutcome::Skipped;
            }
        };

        // Evaluate against the server's current record, not the listed copy
        let mut fresh = match self.get_cluster(&name).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(cluster = %name, error = %e, "Failed to refresh cluster, dropping its client");
                self.cache.remove(&name);
                return ClusterOutcome::Skipped;
            }
        };
        if fresh.is_being_deleted() || !fresh.is_ready() {
            debug!(cluster = %name, "Cluster no longer Ready after refresh, skipping");
            return ClusterOutcome::Skipped;
        }

        let decision = evaluate(
            fresh.annotations_mut(),
            &snapshot,
            &self.policy,
            Utc::now(),
        );
        if !decision.changed() {
            debug!(cluster = %name, "Cluster annotations up to date");
            return ClusterOutcome::Unchanged;
        }

        match self.update_cluster(&fresh).await {
            Ok(_) => {
                info!(cluster = %name, actions = ?decision.actions, "Updated cluster annotations");
                self.notify();
                ClusterOutcome::Updated
            }
            Err(e) => {
                warn!(cluster = %name, error = %e, "Failed to persist cluster annotations");
                ClusterOutcome::Skipped
            }
        }
    }

    // =========================================================================
    // Accessors for dependents
    // =========================================================================

    /// Clusters whose Ready condition is True
    pub async fn ready_clusters(&self) -> Result<Vec<MemberCluster>, Error> {
        Ok(self.list().await?.into_iter().filter(|c| c.is_ready()).collect())
    }

    /// Clusters whose Ready condition is not True
    pub async fn unready_clusters(&self) -> Result<Vec<MemberCluster>, Error> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|c| !c.is_ready())
            .collect())
    }

    /// Cached client for `cluster`, creating one if needed
    pub async fn client_for(&self, cluster: &MemberCluster) -> Result<ClusterClientHandle, Error> {
        self.cache.ensure(cluster).await
    }

    /// Current server-side record of a cluster
    pub async fn get_cluster(&self, name: &str) -> Result<MemberCluster, Error> {
        with_timeout(
            self.call_timeout,
            "get cluster",
            self.source.get(name),
            Error::source_unavailable,
        )
        .await
    }

    /// Persist a cluster record
    pub async fn update_cluster(&self, cluster: &MemberCluster) -> Result<MemberCluster, Error> {
        with_timeout(
            self.call_timeout,
            "update cluster",
            self.source.update(cluster),
            Error::source_unavailable,
        )
        .await
    }

    async fn list(&self) -> Result<Vec<MemberCluster>, Error> {
        with_timeout(
            self.call_timeout,
            "list clusters",
            self.source.list(),
            Error::source_unavailable,
        )
        .await
    }
}

/// Clients are built eagerly only for unmanaged or Ready clusters
fn wants_client(cluster: &MemberCluster) -> bool {
    let state = StateAnnotation::read(cluster.annotations());
    state.is_absent() || state.is(LifecycleState::Ready)
}

/// Builder for constructing [`ReconciliationEngine`] instances
pub struct EngineBuilder {
    source: Arc<dyn ClusterSource>,
    factory: Arc<dyn ClusterClientFactory>,
    policy: LifecyclePolicy,
    reserved_namespaces: Vec<String>,
    call_timeout: Duration,
    max_concurrent_syncs: usize,
    on_change: Option<ChangeNotifier>,
}

impl EngineBuilder {
    fn new(source: Arc<dyn ClusterSource>, factory: Arc<dyn ClusterClientFactory>) -> Self {
        let defaults = ControllerConfig::default();
        Self {
            source,
            factory,
            policy: defaults.policy(),
            reserved_namespaces: defaults.reserved_namespaces.clone(),
            call_timeout: defaults.call_timeout(),
            max_concurrent_syncs: defaults.max_concurrent_syncs,
            on_change: None,
        }
    }

    /// Take policy, namespaces, timeout, and concurrency from `config`
    pub fn config(self, config: &ControllerConfig) -> Self {
        self.policy(config.policy())
            .reserved_namespaces(config.reserved_namespaces.clone())
            .call_timeout(config.call_timeout())
            .max_concurrent_syncs(config.max_concurrent_syncs)
    }

    /// Set the decision-engine defaults
    pub fn policy(mut self, policy: LifecyclePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the namespaces whose pods count as system pods
    pub fn reserved_namespaces(mut self, namespaces: Vec<String>) -> Self {
        self.reserved_namespaces = namespaces;
        self
    }

    /// Set the deadline for each remote call
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set how many clusters a pass evaluates concurrently
    pub fn max_concurrent_syncs(mut self, limit: usize) -> Self {
        self.max_concurrent_syncs = limit.max(1);
        self
    }

    /// Register the change notification
    pub fn on_change(mut self, callback: ChangeNotifier) -> Self {
        self.on_change = Some(callback);
        self
    }

    /// Build the engine
    pub fn build(self) -> ReconciliationEngine {
        let cache = Arc::new(ClusterClientCache::new(self.factory, self.call_timeout));
        let collector =
            CapacityStatsCollector::new(cache.clone(), self.reserved_namespaces, self.call_timeout);

        ReconciliationEngine {
            source: self.source,
            cache,
            collector,
            policy: self.policy,
            call_timeout: self.call_timeout,
            max_concurrent_syncs: self.max_concurrent_syncs,
            known: DashSet::new(),
            cluster_locks: KeyedLocks::new(),
            sync_guard: Mutex::new(()),
            synced: AtomicBool::new(false),
            on_change: RwLock::new(self.on_change),
        }
    }
}
