//! Consistent hash ring with virtual nodes.
//!
//! Keys and node identifiers are projected onto a circular 32-bit hash space.
//! A key belongs to the first ring entry at or after its hash (wrapping past
//! the top), and replica owners are the next distinct physical nodes met while
//! continuing clockwise.

use super::types::NodeId;

use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One virtual-node position on the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingEntry {
    pub hash: u32,
    pub node_id: NodeId,
}

struct RingState {
    /// Sorted by hash; ties broken by node id so rebuilds are reproducible.
    entries: Vec<RingEntry>,
    nodes: HashSet<NodeId>,
}

pub struct HashRing {
    state: RwLock<RingState>,
    virtual_nodes: usize,
}

impl HashRing {
    pub fn new(virtual_nodes: usize) -> Self {
        Self {
            state: RwLock::new(RingState {
                entries: Vec::new(),
                nodes: HashSet::new(),
            }),
            virtual_nodes: virtual_nodes.max(1),
        }
    }

    // Ring state stays consistent even if a holder panicked; recover the guard.
    fn read(&self) -> RwLockReadGuard<'_, RingState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RingState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts the node's virtual-node entries. Adding a node that is already
    /// present is a no-op.
    pub fn add(&self, node_id: &NodeId) {
        let mut state = self.write();
        if !state.nodes.insert(node_id.clone()) {
            return;
        }
        for i in 0..self.virtual_nodes {
            let hash = hash_position(format!("{}-{i}", node_id.0).as_bytes());
            state.entries.push(RingEntry {
                hash,
                node_id: node_id.clone(),
            });
        }
        state
            .entries
            .sort_by(|a, b| a.hash.cmp(&b.hash).then_with(|| a.node_id.0.cmp(&b.node_id.0)));
    }

    /// Removes every virtual-node entry of `node_id`; absent nodes are a no-op.
    pub fn remove(&self, node_id: &NodeId) {
        let mut state = self.write();
        if !state.nodes.remove(node_id) {
            return;
        }
        state.entries.retain(|entry| &entry.node_id != node_id);
    }

    /// The node owning `key`: first entry clockwise from the key's hash.
    /// `None` only when the ring is empty.
    pub fn primary(&self, key: &str) -> Option<NodeId> {
        let state = self.read();
        if state.entries.is_empty() {
            return None;
        }
        let idx = clockwise_index(&state.entries, hash_position(key.as_bytes()));
        Some(state.entries[idx].node_id.clone())
    }

    /// Up to `n` distinct owners for `key`, primary first, walking clockwise
    /// and skipping virtual nodes of physical nodes already collected.
    pub fn owners(&self, key: &str, n: usize) -> Vec<NodeId> {
        let state = self.read();
        if state.entries.is_empty() || n == 0 {
            return Vec::new();
        }
        let start = clockwise_index(&state.entries, hash_position(key.as_bytes()));
        let mut owners: Vec<NodeId> = Vec::new();
        for offset in 0..state.entries.len() {
            let entry = &state.entries[(start + offset) % state.entries.len()];
            if owners.contains(&entry.node_id) {
                continue;
            }
            owners.push(entry.node_id.clone());
            if owners.len() == n {
                break;
            }
        }
        owners
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.read().nodes.contains(node_id)
    }

    pub fn node_count(&self) -> usize {
        self.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// A copy of the raw ring, ascending by hash.
    pub fn entries(&self) -> Vec<RingEntry> {
        self.read().entries.clone()
    }
}

// First entry at or after `hash`, wrapping to the start past the top of the
// 32-bit space.
fn clockwise_index(entries: &[RingEntry], hash: u32) -> usize {
    let idx = entries.partition_point(|entry| entry.hash < hash);
    if idx == entries.len() {
        0
    } else {
        idx
    }
}

// 32-bit projection of a blake3 digest: stable across restarts and uniform
// over the ring space.
fn hash_position(data: &[u8]) -> u32 {
    let digest = blake3::hash(data);
    let bytes = digest.as_bytes();
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
