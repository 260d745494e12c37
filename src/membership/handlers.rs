//! Cluster API Handlers
//!
//! HTTP endpoints exposing the membership operations to peers: registration,
//! heartbeats and the topology listing.

use super::protocol::{HeartbeatRequest, NodeInfo, RegisterRequest};
use super::service::MembershipService;
use super::types::NodeId;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

/// `POST /nodes/register`: announce a node (or refresh a known one).
pub async fn handle_register(
    Extension(membership): Extension<Arc<MembershipService>>,
    Json(req): Json<RegisterRequest>,
) -> (StatusCode, Json<Value>) {
    if req.id.is_empty() || req.address.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "id and address are required" })),
        );
    }

    membership.register(NodeId(req.id), req.address);
    (StatusCode::OK, Json(json!({ "status": "success" })))
}

/// `POST /nodes/heartbeat`: liveness signal from a peer.
pub async fn handle_heartbeat(
    Extension(membership): Extension<Arc<MembershipService>>,
    Json(req): Json<HeartbeatRequest>,
) -> (StatusCode, Json<Value>) {
    if req.id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "id is required" })),
        );
    }

    membership.heartbeat(&NodeId(req.id));
    (StatusCode::OK, Json(json!({ "status": "success" })))
}

/// `GET /nodes/list`: this node's view of the cluster.
pub async fn handle_list_nodes(
    Extension(membership): Extension<Arc<MembershipService>>,
) -> Json<Vec<NodeInfo>> {
    let nodes = membership
        .all_nodes()
        .into_iter()
        .map(|node| NodeInfo {
            id: node.id.0,
            address: node.address,
            status: node.status,
        })
        .collect();
    Json(nodes)
}
