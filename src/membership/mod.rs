//! Membership & Routing Module
//!
//! Maintains the cluster view and decides which node owns which key.
//!
//! ## Core Mechanisms
//! - **Consistent hashing**: Every node contributes a fixed number of virtual
//!   nodes to a 32-bit hash ring; a key belongs to the first node met walking
//!   clockwise from the key's hash, and the following distinct nodes are its
//!   replica owners.
//! - **Registration & heartbeats**: Peers announce themselves over HTTP
//!   (`/nodes/register`) and stay fresh via `/nodes/heartbeat`; a node silent
//!   for two health-check intervals is marked Down but stays in the ring.
//! - **View convergence**: Each node periodically heartbeats every known peer
//!   and merges the node list of one randomly chosen live peer, so the ring
//!   view settles on the same topology cluster-wide.

pub mod handlers;
pub mod protocol;
pub mod ring;
pub mod service;
pub mod types;
