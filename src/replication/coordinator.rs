use super::protocol::{ReplicateSetRequest, ENDPOINT_REPLICATE_DELETE, ENDPOINT_REPLICATE_SET};
use crate::cache::memory::LocalCache;
use crate::membership::service::MembershipService;
use crate::membership::types::Node;

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const REPLICATION_TIMEOUT: Duration = Duration::from_secs(2);

/// Pushes owner-accepted mutations to the key's other replica owners and
/// applies inbound replication mutations to the local store.
///
/// `replica_count` is the number of copies beyond the primary, so the ring is
/// asked for `replica_count + 1` owners and the local node is dropped from the
/// send list.
pub struct ReplicationCoordinator {
    cache: Arc<LocalCache>,
    membership: Arc<MembershipService>,
    replica_count: usize,
    http_client: reqwest::Client,
}

impl ReplicationCoordinator {
    pub fn new(
        cache: Arc<LocalCache>,
        membership: Arc<MembershipService>,
        replica_count: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            cache,
            membership,
            replica_count,
            http_client: reqwest::Client::new(),
        })
    }

    pub fn replica_count(&self) -> usize {
        self.replica_count
    }

    pub(crate) fn replica_targets(&self, key: &str) -> Vec<Node> {
        self.membership
            .owners_for(key, self.replica_count + 1)
            .into_iter()
            .filter(|node| !self.membership.is_local(&node.id))
            .collect()
    }

    /// Fans a locally accepted write out to the other replica owners. Returns
    /// immediately; each target runs on its own task and failures only log.
    pub fn replicate_set(&self, key: &str, value: &Value, ttl_secs: u64) {
        for target in self.replica_targets(key) {
            let client = self.http_client.clone();
            let url = format!("{}{}", target.address, ENDPOINT_REPLICATE_SET);
            let body = ReplicateSetRequest {
                key: key.to_string(),
                value: value.clone(),
                ttl: ttl_secs,
            };
            tokio::spawn(async move {
                let response = client
                    .post(&url)
                    .json(&body)
                    .timeout(REPLICATION_TIMEOUT)
                    .send()
                    .await;
                match response {
                    Ok(resp) if resp.status().is_success() => {}
                    Ok(resp) => warn!(
                        "replication of {:?} to node {} answered {}",
                        body.key,
                        target.id,
                        resp.status()
                    ),
                    Err(e) => warn!("replication of {:?} to node {} failed: {e}", body.key, target.id),
                }
            });
        }
    }

    /// Fans a locally accepted delete out to the other replica owners.
    pub fn replicate_delete(&self, key: &str) {
        for target in self.replica_targets(key) {
            let client = self.http_client.clone();
            let url = format!("{}{}", target.address, ENDPOINT_REPLICATE_DELETE);
            let key = key.to_string();
            tokio::spawn(async move {
                let response = client
                    .delete(&url)
                    .query(&[("key", key.as_str())])
                    .timeout(REPLICATION_TIMEOUT)
                    .send()
                    .await;
                match response {
                    Ok(resp) if resp.status().is_success() => {}
                    Ok(resp) => warn!(
                        "delete replication of {key:?} to node {} answered {}",
                        target.id,
                        resp.status()
                    ),
                    Err(e) => warn!("delete replication of {key:?} to node {} failed: {e}", target.id),
                }
            });
        }
    }

    /// Applies a write that arrived from another node's fan-out. Never
    /// triggers further replication.
    pub fn apply_remote_set(&self, key: &str, value: Value, ttl_secs: u64) {
        self.cache.set(key, value, Duration::from_secs(ttl_secs));
    }

    /// Applies a delete that arrived from another node's fan-out.
    pub fn apply_remote_delete(&self, key: &str) {
        self.cache.delete(key);
    }
}
