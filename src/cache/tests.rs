#[cfg(test)]
mod tests {
    use crate::cache::memory::LocalCache;
    use crate::cache::types::{now_nanos, CacheEntry, EvictionPolicy};
    use serde_json::json;
    use std::time::Duration;

    const NO_TTL: Duration = Duration::ZERO;

    fn lru(capacity: usize) -> LocalCache {
        LocalCache::new(EvictionPolicy::Lru, capacity)
    }

    fn lfu(capacity: usize) -> LocalCache {
        LocalCache::new(EvictionPolicy::Lfu, capacity)
    }

    // ============================================================
    // BASIC OPERATIONS
    // ============================================================

    #[test]
    fn set_then_get_returns_value() {
        let cache = lru(10);
        cache.set("a", json!("1"), NO_TTL);
        assert_eq!(cache.get("a"), Some(json!("1")));
    }

    #[test]
    fn get_missing_key_returns_none() {
        let cache = lru(10);
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn overwrite_replaces_value() {
        let cache = lru(10);
        cache.set("a", json!({"v": 1}), NO_TTL);
        cache.set("a", json!({"v": 2}), NO_TTL);
        assert_eq!(cache.get("a"), Some(json!({"v": 2})));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn delete_is_idempotent() {
        let cache = lru(10);
        cache.set("a", json!("1"), NO_TTL);
        cache.delete("a");
        assert_eq!(cache.get("a"), None);
        cache.delete("a");
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn structured_values_round_trip() {
        let cache = lru(10);
        let value = json!({"title": "Neuromancer", "tags": ["sf", "classic"], "rank": 4.5});
        cache.set("book", value.clone(), NO_TTL);
        assert_eq!(cache.get("book"), Some(value));
    }

    // ============================================================
    // TTL
    // ============================================================

    #[test]
    fn zero_ttl_never_expires() {
        let cache = lru(10);
        cache.set("a", json!("1"), NO_TTL);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("a"), Some(json!("1")));
    }

    #[test]
    fn expired_entry_is_absent_and_removed_on_get() {
        let cache = lru(10);
        cache.set("a", json!("1"), Duration::from_millis(30));
        assert_eq!(cache.get("a"), Some(json!("1")));
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn overwrite_of_expired_entry_starts_fresh() {
        let cache = lru(10);
        cache.set("a", json!("old"), Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(40));
        cache.set("a", json!("new"), NO_TTL);
        assert_eq!(cache.get("a"), Some(json!("new")));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let now = now_nanos();
        let entry = CacheEntry {
            value: json!(1),
            expires_at: now,
            last_access: now,
            access_count: 1,
        };
        assert!(entry.is_expired(now));
        assert!(!entry.is_expired(now - 1));

        let immortal = CacheEntry {
            value: json!(1),
            expires_at: 0,
            last_access: now,
            access_count: 1,
        };
        assert!(!immortal.is_expired(u64::MAX));
    }

    // ============================================================
    // CAPACITY & EVICTION
    // ============================================================

    #[test]
    fn capacity_is_never_exceeded() {
        let cache = lru(10);
        for i in 0..100 {
            cache.set(&format!("key-{i}"), json!(i), NO_TTL);
            assert!(cache.len() <= 10, "store grew past capacity at insert {i}");
        }
        assert_eq!(cache.len(), 10);
    }

    #[test]
    fn lru_evicts_least_recently_accessed() {
        let cache = lru(3);
        cache.set("a", json!("A"), NO_TTL);
        std::thread::sleep(Duration::from_millis(2));
        cache.set("b", json!("B"), NO_TTL);
        std::thread::sleep(Duration::from_millis(2));
        cache.set("c", json!("C"), NO_TTL);
        std::thread::sleep(Duration::from_millis(2));

        // Touch "a" so "b" becomes the oldest access.
        assert!(cache.get("a").is_some());
        cache.set("d", json!("D"), NO_TTL);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("b"), None);
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert!(cache.get("d").is_some());
    }

    #[test]
    fn lfu_evicts_least_frequently_accessed() {
        let cache = lfu(3);
        cache.set("x", json!("X"), NO_TTL);
        cache.set("y", json!("Y"), NO_TTL);
        cache.set("z", json!("Z"), NO_TTL);

        // x: two extra hits, y: one, z: none.
        assert!(cache.get("x").is_some());
        assert!(cache.get("x").is_some());
        assert!(cache.get("y").is_some());

        cache.set("w", json!("W"), NO_TTL);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("z"), None);
        assert!(cache.get("x").is_some());
        assert!(cache.get("y").is_some());
        assert!(cache.get("w").is_some());
    }

    #[test]
    fn eviction_discards_expired_entries_before_picking_a_victim() {
        let cache = lru(2);
        cache.set("short-lived", json!(1), Duration::from_millis(20));
        cache.set("keep", json!(2), NO_TTL);
        std::thread::sleep(Duration::from_millis(40));

        cache.set("new", json!(3), NO_TTL);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("short-lived"), None);
        assert!(cache.get("keep").is_some());
        assert!(cache.get("new").is_some());
    }

    #[test]
    fn capacity_one_always_keeps_latest_insert() {
        let cache = lru(1);
        cache.set("a", json!(1), NO_TTL);
        cache.set("b", json!(2), NO_TTL);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(json!(2)));
    }

    // ============================================================
    // SNAPSHOT / RESTORE
    // ============================================================

    #[test]
    fn snapshot_excludes_expired_entries() {
        let cache = lru(10);
        cache.set("live", json!(1), NO_TTL);
        cache.set("dead", json!(2), Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(40));

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, "live");
    }

    #[test]
    fn restore_drops_expired_and_resets_access_counts() {
        let source = lru(10);
        source.set("a", json!("A"), NO_TTL);
        source.set("b", json!("B"), Duration::from_secs(60));
        for _ in 0..5 {
            assert!(source.get("a").is_some());
        }

        let mut entries = source.snapshot();
        entries.push((
            "expired".to_string(),
            CacheEntry {
                value: json!("gone"),
                expires_at: 1,
                last_access: 1,
                access_count: 7,
            },
        ));

        let target = lru(10);
        target.restore(entries);

        assert_eq!(target.len(), 2);
        assert_eq!(target.get("a"), Some(json!("A")));
        assert_eq!(target.get("b"), Some(json!("B")));
        assert_eq!(target.get("expired"), None);

        // get() above bumped each restored count from its reset value of 1.
        for (_, entry) in target.snapshot() {
            assert_eq!(entry.access_count, 2);
        }
    }
}
