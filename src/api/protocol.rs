//! Cache API Protocol
//!
//! Client-facing endpoints and DTOs, plus the forwarding marker exchanged
//! between nodes when a request is routed to the key's owner.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Public read endpoint (key in the query string).
pub const ENDPOINT_GET: &str = "/get";
/// Public write endpoint.
pub const ENDPOINT_SET: &str = "/set";
/// Public delete endpoint (key in the query string).
pub const ENDPOINT_DELETE: &str = "/delete";
/// Node statistics page.
pub const ENDPOINT_STATS: &str = "/stats";

/// Marks a request that was already routed once. A node receiving it serves
/// locally instead of forwarding again, so requests cannot bounce between
/// peers with disagreeing ring views.
pub const FORWARDED_HEADER: &str = "x-cache-forwarded";

/// Client write. `ttl` is in seconds; zero (the default) means no expiry.
#[derive(Debug, Serialize, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl: u64,
}

/// Body of a successful read.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
}

/// Query-string form of key-addressed endpoints.
#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: Option<String>,
}

/// Body of the `/stats` page.
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeStatsResponse {
    pub node_id: String,
    pub address: String,
    pub items: usize,
    pub capacity: usize,
    pub alive_nodes: usize,
    pub total_nodes: usize,
    pub cpu_usage: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
}
