//! Cache API Module
//!
//! The HTTP edge of a node: client-facing get/set/delete with the routing
//! decision (serve locally or forward to the key's owner), the cluster and
//! replication endpoints, and a stats page.
//!
//! Handlers receive their collaborators through `Extension` layers;
//! `build_router` wires the full surface for `main` and for integration tests.

pub mod forward;
pub mod handlers;
pub mod protocol;

use crate::cache::memory::LocalCache;
use crate::membership::handlers as cluster_handlers;
use crate::membership::protocol::{ENDPOINT_HEARTBEAT, ENDPOINT_LIST, ENDPOINT_REGISTER};
use crate::membership::service::MembershipService;
use crate::replication::coordinator::ReplicationCoordinator;
use crate::replication::handlers as replication_handlers;
use crate::replication::protocol::{ENDPOINT_REPLICATE_DELETE, ENDPOINT_REPLICATE_SET};

use axum::extract::Extension;
use axum::routing::{delete, get, post};
use axum::Router;
use forward::Forwarder;
use protocol::{ENDPOINT_DELETE, ENDPOINT_GET, ENDPOINT_SET, ENDPOINT_STATS};
use std::sync::Arc;

/// Assembles the node's complete HTTP surface.
pub fn build_router(
    cache: Arc<LocalCache>,
    membership: Arc<MembershipService>,
    replication: Arc<ReplicationCoordinator>,
) -> Router {
    Router::new()
        // Cache API
        .route(ENDPOINT_GET, get(handlers::handle_get))
        .route(ENDPOINT_SET, post(handlers::handle_set))
        .route(ENDPOINT_DELETE, delete(handlers::handle_delete))
        .route(ENDPOINT_STATS, get(handlers::handle_stats))
        // Cluster API
        .route(ENDPOINT_REGISTER, post(cluster_handlers::handle_register))
        .route(ENDPOINT_HEARTBEAT, post(cluster_handlers::handle_heartbeat))
        .route(ENDPOINT_LIST, get(cluster_handlers::handle_list_nodes))
        // Replication API
        .route(
            ENDPOINT_REPLICATE_SET,
            post(replication_handlers::handle_replicate_set),
        )
        .route(
            ENDPOINT_REPLICATE_DELETE,
            delete(replication_handlers::handle_replicate_delete),
        )
        .layer(Extension(cache))
        .layer(Extension(membership))
        .layer(Extension(replication))
        .layer(Extension(Forwarder::new()))
}
