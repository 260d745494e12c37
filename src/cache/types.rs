use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Victim selection policy applied when an insert hits the capacity limit.
/// Fixed at construction; a store never changes policy at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Evict the entry with the oldest `last_access`.
    Lru,
    /// Evict the entry with the smallest `access_count`.
    Lfu,
}

impl FromStr for EvictionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lru" => Ok(EvictionPolicy::Lru),
            "lfu" => Ok(EvictionPolicy::Lfu),
            other => bail!("unknown eviction policy: {other} (expected lru or lfu)"),
        }
    }
}

/// A single stored item together with the metadata the TTL and eviction
/// machinery needs.
///
/// `expires_at` and `last_access` are absolute nanosecond timestamps since the
/// Unix epoch, so they stay meaningful across process restarts and snapshot
/// round-trips. An `expires_at` of zero means the entry never expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub expires_at: u64,
    pub last_access: u64,
    pub access_count: u64,
}

impl CacheEntry {
    /// An entry is expired once the clock reaches `expires_at`; zero is the
    /// "never expires" sentinel.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at > 0 && self.expires_at <= now
    }
}

pub fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
