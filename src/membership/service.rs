use super::protocol::{
    HeartbeatRequest, NodeInfo, RegisterRequest, ENDPOINT_HEARTBEAT, ENDPOINT_LIST,
    ENDPOINT_REGISTER,
};
use super::ring::HashRing;
use super::types::{Node, NodeId, NodeStatus};

use anyhow::{bail, Result};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Ring positions each physical node contributes.
pub const VIRTUAL_NODES: usize = 10;

const PEER_TIMEOUT: Duration = Duration::from_secs(2);
const SEED_JOIN_ATTEMPTS: usize = 5;

/// Cluster view owner: tracks every known peer, its health and the hash ring,
/// and answers all "who owns this key" queries.
pub struct MembershipService {
    pub local_node: Node,
    members: DashMap<NodeId, Node>,
    ring: HashRing,
    check_interval: Duration,
    http_client: reqwest::Client,
}

impl MembershipService {
    pub fn new(local_id: NodeId, address: String, check_interval: Duration) -> Arc<Self> {
        let local_node = Node {
            id: local_id.clone(),
            address,
            status: NodeStatus::Up,
            last_seen: Some(Instant::now()),
        };
        let members = DashMap::new();
        members.insert(local_id.clone(), local_node.clone());
        let ring = HashRing::new(VIRTUAL_NODES);
        ring.add(&local_id);

        Arc::new(Self {
            local_node,
            members,
            ring,
            check_interval,
            http_client: reqwest::Client::new(),
        })
    }

    /// Adds a node to the cluster view and the ring, or refreshes a known one.
    pub fn register(&self, id: NodeId, address: String) {
        if let Some(mut member) = self.members.get_mut(&id) {
            member.address = address;
            member.status = NodeStatus::Up;
            member.last_seen = Some(Instant::now());
            return;
        }

        info!("node {} registered at {}", id, address);
        self.members.insert(
            id.clone(),
            Node {
                id: id.clone(),
                address,
                status: NodeStatus::Up,
                last_seen: Some(Instant::now()),
            },
        );
        self.ring.add(&id);
    }

    /// Refreshes liveness for a known node; unknown ids are ignored.
    pub fn heartbeat(&self, id: &NodeId) {
        match self.members.get_mut(id) {
            Some(mut member) => {
                member.last_seen = Some(Instant::now());
                member.status = NodeStatus::Up;
            }
            None => debug!("heartbeat from unknown node {}", id),
        }
    }

    /// Primary owner of `key`, or `None` on an empty ring.
    pub fn owner_for(&self, key: &str) -> Option<Node> {
        let id = self.ring.primary(key)?;
        self.members.get(&id).map(|member| member.value().clone())
    }

    /// Up to `n` distinct owners of `key` in ring order, resolved to
    /// descriptors. Ids without a descriptor (mid-registration) are skipped.
    pub fn owners_for(&self, key: &str, n: usize) -> Vec<Node> {
        self.ring
            .owners(key, n)
            .into_iter()
            .filter_map(|id| self.members.get(&id).map(|member| member.value().clone()))
            .collect()
    }

    /// First owner of `key` that is currently Up, considering up to `n`
    /// candidates. `None` means no live owner exists.
    pub fn first_up_owner(&self, key: &str, n: usize) -> Option<Node> {
        self.owners_for(key, n)
            .into_iter()
            .find(|node| node.status == NodeStatus::Up)
    }

    pub fn local(&self) -> &Node {
        &self.local_node
    }

    pub fn is_local(&self, id: &NodeId) -> bool {
        id == &self.local_node.id
    }

    pub fn all_nodes(&self) -> Vec<Node> {
        self.members
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn alive_nodes(&self) -> Vec<Node> {
        self.members
            .iter()
            .filter(|entry| entry.value().status == NodeStatus::Up)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Spawns the failure-detection and heartbeat/sync loops. Both exit when
    /// `shutdown` flips.
    pub fn start(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        let service = self.clone();
        let rx = shutdown.clone();
        tokio::spawn(async move {
            service.health_check_loop(rx).await;
        });

        let service = self;
        tokio::spawn(async move {
            service.heartbeat_loop(shutdown).await;
        });
    }

    /// Registers with a seed node and pulls its cluster view. Retries with
    /// backoff since the seed may still be starting.
    pub async fn join_seed(&self, seed: &str) -> Result<()> {
        let url = format!("{seed}{ENDPOINT_REGISTER}");
        let body = RegisterRequest {
            id: self.local_node.id.0.clone(),
            address: self.local_node.address.clone(),
        };

        let mut delay_ms = 500u64;
        for attempt in 1..=SEED_JOIN_ATTEMPTS {
            let response = self
                .http_client
                .post(&url)
                .json(&body)
                .timeout(PEER_TIMEOUT)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    info!("registered with seed node {}", seed);
                    match self.fetch_node_list(seed).await {
                        Ok(list) => self.merge_nodes(list),
                        Err(e) => warn!("could not pull node list from seed: {e}"),
                    }
                    return Ok(());
                }
                Ok(resp) => warn!(
                    "seed registration attempt {attempt} answered {}",
                    resp.status()
                ),
                Err(e) => warn!("seed registration attempt {attempt} failed: {e}"),
            }

            let jitter = rand::random::<u64>() % 200;
            tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
            delay_ms = (delay_ms * 2).min(5_000);
        }

        bail!("could not register with seed node {seed}")
    }

    async fn health_check_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.check_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => self.sweep_health(),
                _ = shutdown.changed() => break,
            }
        }
    }

    // A node is Down once it has been silent for two check intervals; the
    // doubled window keeps a single missed tick from flapping the status.
    pub(crate) fn sweep_health(&self) {
        let cutoff = self.check_interval * 2;
        for mut entry in self.members.iter_mut() {
            let member = entry.value_mut();
            if member.id == self.local_node.id {
                continue;
            }
            let Some(last_seen) = member.last_seen else {
                member.last_seen = Some(Instant::now());
                continue;
            };
            if member.status == NodeStatus::Up && last_seen.elapsed() > cutoff {
                warn!(
                    "node {} at {} is down (silent for {:?})",
                    member.id,
                    member.address,
                    last_seen.elapsed()
                );
                member.status = NodeStatus::Down;
            }
        }
    }

    async fn heartbeat_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.check_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.send_heartbeats().await;
                    self.sync_from_peer().await;
                }
                _ = shutdown.changed() => break,
            }
        }
    }

    // Down peers are heartbeated too, so a recovered node learns we are still
    // here as soon as it is back.
    async fn send_heartbeats(&self) {
        let body = HeartbeatRequest {
            id: self.local_node.id.0.clone(),
        };
        for peer in self.peers() {
            let url = format!("{}{}", peer.address, ENDPOINT_HEARTBEAT);
            let response = self
                .http_client
                .post(&url)
                .json(&body)
                .timeout(PEER_TIMEOUT)
                .send()
                .await;
            match response {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => debug!("heartbeat to {} answered {}", peer.id, resp.status()),
                Err(e) => debug!("heartbeat to {} failed: {e}", peer.id),
            }
        }
    }

    // Pull one random live peer's view and adopt any node we have not met.
    async fn sync_from_peer(&self) {
        let candidates: Vec<Node> = self
            .peers()
            .into_iter()
            .filter(|peer| peer.status == NodeStatus::Up)
            .collect();
        if candidates.is_empty() {
            return;
        }

        use rand::Rng;
        let target = &candidates[rand::thread_rng().gen_range(0..candidates.len())];
        match self.fetch_node_list(&target.address).await {
            Ok(list) => self.merge_nodes(list),
            Err(e) => debug!("node list sync from {} failed: {e}", target.id),
        }
    }

    async fn fetch_node_list(&self, address: &str) -> Result<Vec<NodeInfo>> {
        let url = format!("{address}{ENDPOINT_LIST}");
        let resp = self
            .http_client
            .get(&url)
            .timeout(PEER_TIMEOUT)
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("node list request answered {}", resp.status());
        }
        Ok(resp.json().await?)
    }

    pub(crate) fn merge_nodes(&self, list: Vec<NodeInfo>) {
        for info in list {
            let id = NodeId(info.id);
            if self.is_local(&id) || self.members.contains_key(&id) {
                continue;
            }
            // Down nodes are the reporting peer's problem until they register
            // or heartbeat us directly.
            if info.status != NodeStatus::Up {
                continue;
            }
            self.register(id, info.address);
        }
    }

    fn peers(&self) -> Vec<Node> {
        self.members
            .iter()
            .filter(|entry| entry.value().id != self.local_node.id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}
