//! kube-rs backed cluster source

use async_trait::async_trait;
use futures::StreamExt;
use kube::api::{Api, ListParams, PostParams};
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use kube::{Client, ResourceExt};
use tracing::debug;

use super::{ClusterSource, WatchEvent, WatchStream};
use crate::crd::MemberCluster;
use crate::{Error, FIELD_MANAGER};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
///
/// Forces the API server to close idle watches before the client gives up on
/// the response body.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Cluster source over cluster-scoped MemberCluster resources
#[derive(Clone)]
pub struct KubeClusterSource {
    api: Api<MemberCluster>,
}

impl KubeClusterSource {
    /// Create a source using the given kube Client
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl ClusterSource for KubeClusterSource {
    async fn list(&self) -> Result<Vec<MemberCluster>, Error> {
        let clusters = self
            .api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::source_unavailable(format!("list clusters: {e}")))?;
        Ok(clusters.items)
    }

    fn watch(&self) -> WatchStream {
        let config = watcher::Config::default().timeout(WATCH_TIMEOUT_SECS);
        watcher::watcher(self.api.clone(), config)
            .default_backoff()
            .filter_map(|event| async move {
                match event {
                    Ok(Event::InitApply(cluster)) => Some(Ok(WatchEvent::Added(cluster))),
                    Ok(Event::Apply(cluster)) => Some(Ok(WatchEvent::Modified(cluster))),
                    Ok(Event::Delete(cluster)) => Some(Ok(WatchEvent::Deleted(cluster))),
                    Ok(Event::Init) | Ok(Event::InitDone) => {
                        debug!("MemberCluster watcher (re)listed");
                        None
                    }
                    Err(e) => Some(Err(Error::source_unavailable(format!(
                        "watch clusters: {e}"
                    )))),
                }
            })
            .boxed()
    }

    async fn get(&self, name: &str) -> Result<MemberCluster, Error> {
        self.api
            .get(name)
            .await
            .map_err(|e| Error::source_unavailable(format!("get cluster {name}: {e}")))
    }

    async fn update(&self, cluster: &MemberCluster) -> Result<MemberCluster, Error> {
        let name = cluster.name_any();
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };

        self.api
            .replace(&name, &params, cluster)
            .await
            .map_err(|e| match e {
                kube::Error::Api(ref response) if response.code == 409 => {
                    Error::persist_conflict(&name, response.message.clone())
                }
                other => Error::source_unavailable(format!("update cluster {name}: {other}")),
            })
    }
}
