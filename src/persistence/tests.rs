#[cfg(test)]
mod tests {
    use crate::cache::memory::LocalCache;
    use crate::cache::types::EvictionPolicy;
    use crate::persistence::manager::PersistenceManager;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn new_cache() -> Arc<LocalCache> {
        Arc::new(LocalCache::new(EvictionPolicy::Lru, 100))
    }

    fn manager_at(cache: Arc<LocalCache>, path: PathBuf) -> Arc<PersistenceManager> {
        PersistenceManager::new(cache, path, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn save_creates_file_and_leaves_no_tmp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = new_cache();
        cache.set("a", json!(1), Duration::ZERO);

        let manager = manager_at(cache, path.clone());
        manager.save_to_disk().await.unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("cache.json.tmp").exists());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_non_expired_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let source = new_cache();
        for i in 0..50 {
            source.set(&format!("key-{i}"), json!({"n": i}), Duration::ZERO);
        }
        // A couple of reads so the source has uneven access counts.
        for _ in 0..3 {
            assert!(source.get("key-0").is_some());
        }
        source.set("doomed", json!("bye"), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(40)).await;

        manager_at(source, path.clone()).save_to_disk().await.unwrap();

        let restored = new_cache();
        manager_at(restored.clone(), path)
            .load_from_disk()
            .await
            .unwrap();

        assert_eq!(restored.len(), 50);
        assert_eq!(restored.get("key-0"), Some(json!({"n": 0})));
        assert_eq!(restored.get("key-49"), Some(json!({"n": 49})));
        assert_eq!(restored.get("doomed"), None);

        // Access counts start over at one (bumped once by the get above).
        let entry = restored
            .snapshot()
            .into_iter()
            .find(|(key, _)| key == "key-0")
            .unwrap();
        assert_eq!(entry.1.access_count, 2);
    }

    #[tokio::test]
    async fn load_with_missing_file_is_a_no_op() {
        let dir = tempdir().unwrap();
        let cache = new_cache();
        manager_at(cache.clone(), dir.path().join("absent.json"))
            .load_from_disk()
            .await
            .unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty_without_failing_startup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, b"{ this is not json").await.unwrap();

        let cache = new_cache();
        manager_at(cache.clone(), path)
            .load_from_disk()
            .await
            .unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn new_snapshot_replaces_the_previous_one() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = new_cache();
        let manager = manager_at(cache.clone(), path.clone());

        cache.set("old", json!(1), Duration::ZERO);
        manager.save_to_disk().await.unwrap();

        cache.delete("old");
        cache.set("new", json!(2), Duration::ZERO);
        manager.save_to_disk().await.unwrap();

        let restored = new_cache();
        manager_at(restored.clone(), path)
            .load_from_disk()
            .await
            .unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.get("new"), Some(json!(2)));
    }

    #[tokio::test]
    async fn stop_takes_a_final_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = new_cache();
        let manager = manager_at(cache.clone(), path.clone());

        // Long interval: no periodic tick fires during the test.
        manager.start().await;
        cache.set("written-late", json!("v"), Duration::ZERO);
        manager.stop().await;

        let restored = new_cache();
        manager_at(restored.clone(), path)
            .load_from_disk()
            .await
            .unwrap();
        assert_eq!(restored.get("written-late"), Some(json!("v")));
    }
}
