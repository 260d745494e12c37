//! Cache API Handlers
//!
//! Client-facing get/set/delete. Each handler first decides whether this node
//! owns the key: requests for foreign keys are forwarded to the first live
//! owner and the owner's answer is relayed as-is. Requests carrying the
//! forwarded marker are always served locally.

use super::forward::Forwarder;
use super::protocol::{
    GetResponse, KeyQuery, NodeStatsResponse, SetRequest, ENDPOINT_DELETE, ENDPOINT_GET,
    ENDPOINT_SET, FORWARDED_HEADER,
};
use crate::cache::memory::LocalCache;
use crate::membership::service::MembershipService;
use crate::membership::types::Node;
use crate::replication::coordinator::ReplicationCoordinator;

use axum::extract::{Extension, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;

pub(crate) fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

enum RouteDecision {
    Local,
    Forward(Node),
    Unavailable,
}

// The owner of a key is the first Up node in its replica owner list; a Down
// primary is skipped in favor of a live secondary rather than failing fast.
fn route(
    membership: &MembershipService,
    replication: &ReplicationCoordinator,
    headers: &HeaderMap,
    key: &str,
) -> RouteDecision {
    if headers.contains_key(FORWARDED_HEADER) {
        return RouteDecision::Local;
    }
    match membership.first_up_owner(key, replication.replica_count() + 1) {
        None => RouteDecision::Unavailable,
        Some(owner) if membership.is_local(&owner.id) => RouteDecision::Local,
        Some(owner) => RouteDecision::Forward(owner),
    }
}

/// `GET /get?key=`: 200 with `{key, value}` on hit, 404 on miss.
pub async fn handle_get(
    Extension(cache): Extension<Arc<LocalCache>>,
    Extension(membership): Extension<Arc<MembershipService>>,
    Extension(replication): Extension<Arc<ReplicationCoordinator>>,
    Extension(forwarder): Extension<Arc<Forwarder>>,
    headers: HeaderMap,
    Query(params): Query<KeyQuery>,
) -> Response {
    let Some(key) = params.key.filter(|key| !key.is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "key is required");
    };

    match route(&membership, &replication, &headers, &key) {
        RouteDecision::Unavailable => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "no live owner for key")
        }
        RouteDecision::Forward(owner) => forwarder.forward_get(&owner, ENDPOINT_GET, &key).await,
        RouteDecision::Local => match cache.get(&key) {
            Some(value) => (StatusCode::OK, Json(GetResponse { key, value })).into_response(),
            None => json_error(StatusCode::NOT_FOUND, "key not found"),
        },
    }
}

/// `POST /set`: 201 on success. The accepted write is fanned out to the
/// key's other replica owners after the local apply.
pub async fn handle_set(
    Extension(cache): Extension<Arc<LocalCache>>,
    Extension(membership): Extension<Arc<MembershipService>>,
    Extension(replication): Extension<Arc<ReplicationCoordinator>>,
    Extension(forwarder): Extension<Arc<Forwarder>>,
    headers: HeaderMap,
    Json(req): Json<SetRequest>,
) -> Response {
    if req.key.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "key is required");
    }

    match route(&membership, &replication, &headers, &req.key) {
        RouteDecision::Unavailable => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "no live owner for key")
        }
        RouteDecision::Forward(owner) => forwarder.forward_set(&owner, ENDPOINT_SET, &req).await,
        RouteDecision::Local => {
            cache.set(&req.key, req.value.clone(), Duration::from_secs(req.ttl));
            replication.replicate_set(&req.key, &req.value, req.ttl);
            (StatusCode::CREATED, Json(json!({ "status": "success" }))).into_response()
        }
    }
}

/// `DELETE /delete?key=`: 200 on success, also when the key was absent.
pub async fn handle_delete(
    Extension(cache): Extension<Arc<LocalCache>>,
    Extension(membership): Extension<Arc<MembershipService>>,
    Extension(replication): Extension<Arc<ReplicationCoordinator>>,
    Extension(forwarder): Extension<Arc<Forwarder>>,
    headers: HeaderMap,
    Query(params): Query<KeyQuery>,
) -> Response {
    let Some(key) = params.key.filter(|key| !key.is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "key is required");
    };

    match route(&membership, &replication, &headers, &key) {
        RouteDecision::Unavailable => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "no live owner for key")
        }
        RouteDecision::Forward(owner) => {
            forwarder.forward_delete(&owner, ENDPOINT_DELETE, &key).await
        }
        RouteDecision::Local => {
            cache.delete(&key);
            replication.replicate_delete(&key);
            (StatusCode::OK, Json(json!({ "status": "success" }))).into_response()
        }
    }
}

/// `GET /stats`: node identity, store occupancy, cluster view and host load.
pub async fn handle_stats(
    Extension(cache): Extension<Arc<LocalCache>>,
    Extension(membership): Extension<Arc<MembershipService>>,
) -> Json<NodeStatsResponse> {
    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo returns bytes for memory values.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    let local = membership.local();
    Json(NodeStatsResponse {
        node_id: local.id.0.clone(),
        address: local.address.clone(),
        items: cache.len(),
        capacity: cache.capacity(),
        alive_nodes: membership.alive_nodes().len(),
        total_nodes: membership.all_nodes().len(),
        cpu_usage,
        mem_used_mb,
        mem_total_mb,
    })
}
