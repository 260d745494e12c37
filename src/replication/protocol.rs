//! Replication Network Protocol
//!
//! Endpoints and DTOs for pushing mutations from a key's primary to its
//! replica owners. Handlers behind these endpoints must never re-replicate.

use serde::{Deserialize, Serialize};

/// Endpoint replicated writes are posted to.
pub const ENDPOINT_REPLICATE_SET: &str = "/replicate/set";
/// Endpoint replicated deletes are sent to (key in the query string).
pub const ENDPOINT_REPLICATE_DELETE: &str = "/replicate/delete";

/// A write pushed to a replica. `ttl` is in seconds; zero means no expiry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicateSetRequest {
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub ttl: u64,
}
