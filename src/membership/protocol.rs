//! Cluster Network Protocol
//!
//! API endpoints and DTOs for node registration, heartbeats and topology
//! listing. All messages travel as JSON over HTTP.

use super::types::NodeStatus;
use serde::{Deserialize, Serialize};

/// Endpoint a joining node posts its identity to.
pub const ENDPOINT_REGISTER: &str = "/nodes/register";
/// Endpoint peers post liveness signals to.
pub const ENDPOINT_HEARTBEAT: &str = "/nodes/heartbeat";
/// Endpoint serving this node's view of the cluster.
pub const ENDPOINT_LIST: &str = "/nodes/list";

/// Announcement of a node's identity and transport endpoint.
/// Re-registering a known id refreshes its address and marks it Up.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub id: String,
    pub address: String,
}

/// Liveness signal; the receiver refreshes `last_seen` for the sender.
/// Heartbeats from unknown ids are ignored.
#[derive(Debug, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub id: String,
}

/// One row of the `/nodes/list` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: String,
    pub address: String,
    pub status: NodeStatus,
}
