//! Distributed In-Memory Cache Library
//!
//! This library crate defines the core modules of a horizontally scalable
//! key/value cache. It is the foundation for the node binary (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of five loosely coupled subsystems:
//!
//! - **`cache`**: The node-local store. A concurrent map with per-key TTL,
//!   access tracking, and bounded capacity enforced by LRU or LFU eviction.
//! - **`membership`**: The cluster coordination layer. Tracks peers and their
//!   health, and owns the consistent hash ring that maps every key to an
//!   ordered list of owner nodes.
//! - **`replication`**: Best-effort write fan-out. Owner-accepted mutations
//!   are pushed asynchronously to the key's other replica owners.
//! - **`persistence`**: Durability for the local shard. Periodic snapshots
//!   installed by atomic rename, restored at startup.
//! - **`api`**: The HTTP edge. Client operations with owner routing and
//!   forwarding, plus the cluster and replication endpoints.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod membership;
pub mod persistence;
pub mod replication;
