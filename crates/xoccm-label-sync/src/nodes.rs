//! Node listing and label patching
//!
//! The controller reads nodes from a reflector cache instead of listing the
//! API server every tick. Writes go straight to the API server as a merge
//! patch on `metadata.labels`, which applies every key or none.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Patch, PatchParams};
use kube::runtime::reflector::{self, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use xoccm_common::labels::TAINT_EXTERNAL_CLOUD_PROVIDER;
use xoccm_common::{Error, CONTROLLER_NAME};

/// Node collaborator used by the label sync controller
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Point-in-time snapshot of all known nodes
    async fn list_nodes(&self) -> Result<Vec<Node>, Error>;

    /// Add or overwrite `labels` on `node`
    ///
    /// Returns whether the change was persisted. A multi-key update is never
    /// partially applied. API failures surface as [`Error::Kube`], so a
    /// rejected patch (4xx) is not retried like an unreachable API server.
    async fn patch_labels(
        &self,
        node: &Node,
        labels: &BTreeMap<String, String>,
    ) -> Result<bool, Error>;
}

/// True while the node still waits for the cloud node initializer
pub fn has_uninitialized_taint(node: &Node) -> bool {
    node.spec
        .as_ref()
        .and_then(|spec| spec.taints.as_ref())
        .is_some_and(|taints| {
            taints
                .iter()
                .any(|taint| taint.key == TAINT_EXTERNAL_CLOUD_PROVIDER)
        })
}

/// [`NodeClient`] backed by a reflector cache and the Node API
pub struct KubeNodeClient {
    api: Api<Node>,
    store: Store<Node>,
}

impl KubeNodeClient {
    /// Start watching nodes
    ///
    /// The watch runs until `shutdown` is cancelled. Call
    /// [`wait_until_ready`](Self::wait_until_ready) before the first listing.
    pub fn spawn(client: Client, shutdown: CancellationToken) -> Self {
        let api: Api<Node> = Api::all(client);
        let (store, writer) = reflector::store();

        let stream = reflector::reflector(writer, watcher(api.clone(), watcher::Config::default()))
            .default_backoff()
            .touched_objects();

        tokio::spawn(async move {
            tokio::pin!(stream);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Node watch cancelled");
                        break;
                    }
                    event = stream.next() => match event {
                        Some(Ok(_)) => {}
                        Some(Err(e)) => warn!(error = %e, "Node watch error, retrying"),
                        None => {
                            warn!("Node watch stream ended");
                            break;
                        }
                    }
                }
            }
        });

        Self { api, store }
    }

    /// Wait for the initial node listing to land in the cache
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<(), Error> {
        match tokio::time::timeout(timeout, self.store.wait_until_ready()).await {
            Ok(Ok(())) => {
                info!(nodes = self.store.state().len(), "Node cache synced");
                Ok(())
            }
            Ok(Err(e)) => Err(Error::CacheSync {
                message: e.to_string(),
            }),
            Err(_) => Err(Error::CacheSync {
                message: format!("timed out after {}s", timeout.as_secs()),
            }),
        }
    }
}

#[async_trait]
impl NodeClient for KubeNodeClient {
    async fn list_nodes(&self) -> Result<Vec<Node>, Error> {
        Ok(self
            .store
            .state()
            .iter()
            .map(|node| node.as_ref().clone())
            .collect())
    }

    async fn patch_labels(
        &self,
        node: &Node,
        labels: &BTreeMap<String, String>,
    ) -> Result<bool, Error> {
        if labels.is_empty() {
            return Ok(false);
        }

        let name = node.name_any();
        let patch = serde_json::json!({
            "metadata": {
                "labels": labels
            }
        });

        let updated = self
            .api
            .patch(
                &name,
                &PatchParams::apply(CONTROLLER_NAME),
                &Patch::Merge(&patch),
            )
            .await?;

        let persisted = updated.labels();
        Ok(labels
            .iter()
            .all(|(key, value)| persisted.get(key) == Some(value)))
    }
}
