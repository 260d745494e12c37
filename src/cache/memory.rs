use super::types::{now_nanos, CacheEntry, EvictionPolicy};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// In-memory store for the shard this node owns.
///
/// Reads run concurrently on the underlying map shards. Anything that has to
/// observe capacity (insert, delete, eviction, expiry removal) serializes on
/// `write_gate`, so an insert into a full store evicts exactly one victim and
/// the item count never exceeds the configured maximum.
pub struct LocalCache {
    items: DashMap<String, CacheEntry>,
    policy: EvictionPolicy,
    max_items: usize,
    write_gate: Mutex<()>,
}

impl LocalCache {
    pub fn new(policy: EvictionPolicy, max_items: usize) -> Self {
        Self {
            items: DashMap::new(),
            policy,
            max_items: max_items.max(1),
            write_gate: Mutex::new(()),
        }
    }

    // A poisoned gate only means a writer panicked; the map itself is still
    // consistent, so recover the guard instead of propagating the poison.
    fn gate(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts or overwrites `key`. A `ttl` of zero stores an entry that never
    /// expires. When the key is new and the store is full, one victim is
    /// evicted first.
    pub fn set(&self, key: &str, value: Value, ttl: Duration) {
        let _gate = self.gate();

        let now = now_nanos();
        let expires_at = if ttl.is_zero() {
            0
        } else {
            now.saturating_add(ttl.as_nanos() as u64)
        };

        if !self.items.contains_key(key) && self.items.len() >= self.max_items {
            self.evict_one(now);
        }

        match self.items.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if entry.is_expired(now) {
                    // The old entry was logically absent; this is a fresh insert.
                    entry.access_count = 1;
                }
                entry.value = value;
                entry.expires_at = expires_at;
                entry.last_access = now;
            }
            Entry::Vacant(slot) => {
                slot.insert(CacheEntry {
                    value,
                    expires_at,
                    last_access: now,
                    access_count: 1,
                });
            }
        }
    }

    /// Returns the value for `key`, bumping its access metadata. An expired
    /// entry is removed inline and reported as absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = now_nanos();
        {
            let mut entry = self.items.get_mut(key)?;
            if !entry.is_expired(now) {
                entry.last_access = now;
                entry.access_count += 1;
                return Some(entry.value.clone());
            }
        }

        // Expired: retire it, rechecking under the gate in case a concurrent
        // set already replaced it with a live entry.
        let _gate = self.gate();
        self.items
            .remove_if(key, |_, entry| entry.is_expired(now_nanos()));
        None
    }

    /// Removes `key` if present; absent keys are a no-op.
    pub fn delete(&self, key: &str) {
        let _gate = self.gate();
        self.items.remove(key);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_items
    }

    /// Copies out every non-expired entry. Used by the persistence engine;
    /// iteration locks one map shard at a time, so concurrent reads keep going.
    pub fn snapshot(&self) -> Vec<(String, CacheEntry)> {
        let now = now_nanos();
        self.items
            .iter()
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Bulk load at startup. Entries already expired are discarded and every
    /// restored entry starts over with an access count of one.
    pub fn restore(&self, entries: Vec<(String, CacheEntry)>) {
        let _gate = self.gate();
        let now = now_nanos();
        for (key, mut entry) in entries {
            if entry.is_expired(now) {
                continue;
            }
            entry.access_count = 1;
            self.items.insert(key, entry);
        }
    }

    // Caller holds the write gate. Expired entries found during the scan are
    // discarded; a policy victim is only taken when none of them freed a slot.
    fn evict_one(&self, now: u64) {
        let mut expired: Vec<String> = Vec::new();
        let mut victim: Option<(String, u64)> = None;

        for entry in self.items.iter() {
            if entry.is_expired(now) {
                expired.push(entry.key().clone());
                continue;
            }
            let weight = match self.policy {
                EvictionPolicy::Lru => entry.last_access,
                EvictionPolicy::Lfu => entry.access_count,
            };
            let better = match &victim {
                Some((_, best)) => weight < *best,
                None => true,
            };
            if better {
                victim = Some((entry.key().clone(), weight));
            }
        }

        if !expired.is_empty() {
            for key in &expired {
                self.items.remove(key);
            }
            tracing::debug!("discarded {} expired entries during eviction", expired.len());
            return;
        }

        if let Some((key, _)) = victim {
            tracing::debug!("evicting {:?} ({:?})", key, self.policy);
            self.items.remove(&key);
        }
    }
}
