use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Unique identifier for a node in the cluster.
/// Wrapper around a UUID string to ensure global uniqueness across restarts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NodeId(pub String);

impl NodeId {
    /// Generates a new random UUID v4-based NodeId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health of a node as observed by the local failure detector. A Down node
/// keeps its ring positions; routing decides how to treat it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Up,
    Down,
}

/// A single member of the cluster: identity, transport endpoint and health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Base URL of the node's HTTP API, e.g. `http://10.0.0.7:8080`.
    pub address: String,
    pub status: NodeStatus,

    /// Local timestamp of when this node was last heard from.
    /// Not serialized over the network; used only by the local failure detector.
    #[serde(skip)]
    pub last_seen: Option<Instant>,
}
