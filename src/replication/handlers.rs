//! Replication API Handlers
//!
//! Inbound side of the fan-out: these endpoints write straight into the local
//! store and never re-replicate, which is what stops a mutation from bouncing
//! around the cluster.

use super::coordinator::ReplicationCoordinator;
use super::protocol::ReplicateSetRequest;
use crate::api::protocol::KeyQuery;

use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

/// `POST /replicate/set`: apply a replicated write locally.
pub async fn handle_replicate_set(
    Extension(replication): Extension<Arc<ReplicationCoordinator>>,
    Json(req): Json<ReplicateSetRequest>,
) -> (StatusCode, Json<Value>) {
    if req.key.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "key is required" })),
        );
    }

    replication.apply_remote_set(&req.key, req.value, req.ttl);
    (StatusCode::OK, Json(json!({ "status": "success" })))
}

/// `DELETE /replicate/delete?key=`: apply a replicated delete locally.
pub async fn handle_replicate_delete(
    Extension(replication): Extension<Arc<ReplicationCoordinator>>,
    Query(params): Query<KeyQuery>,
) -> (StatusCode, Json<Value>) {
    let Some(key) = params.key.filter(|key| !key.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "key is required" })),
        );
    };

    replication.apply_remote_delete(&key);
    (StatusCode::OK, Json(json!({ "status": "success" })))
}
