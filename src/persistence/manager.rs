use crate::cache::memory::LocalCache;
use crate::cache::types::{now_nanos, CacheEntry};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// On-disk form of one entry. Field names and nanosecond timestamps are part
/// of the file format; `expiration == 0` means the entry never expires.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    value: Value,
    expiration: u64,
    #[serde(rename = "lastAccess")]
    last_access: u64,
}

/// Saves the local store to disk on a fixed interval and loads it back at
/// startup.
pub struct PersistenceManager {
    cache: Arc<LocalCache>,
    file_path: PathBuf,
    save_interval: Duration,
    /// Serializes saves with each other and with the stop-triggered final save.
    save_lock: tokio::sync::Mutex<()>,
    stop_tx: watch::Sender<bool>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl PersistenceManager {
    pub fn new(cache: Arc<LocalCache>, file_path: PathBuf, save_interval: Duration) -> Arc<Self> {
        let (stop_tx, _) = watch::channel(false);
        Arc::new(Self {
            cache,
            file_path,
            save_interval,
            save_lock: tokio::sync::Mutex::new(()),
            stop_tx,
            task: std::sync::Mutex::new(None),
        })
    }

    /// Restores any previous snapshot, then begins the periodic save loop.
    pub async fn start(self: &Arc<Self>) {
        if let Err(e) = self.load_from_disk().await {
            error!(
                "could not load snapshot from {}: {e:#}",
                self.file_path.display()
            );
        }

        let manager = self.clone();
        let mut stop_rx = self.stop_tx.subscribe();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(manager.save_interval);
            // Swallow the immediate first tick; the store is still warming up.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = manager.save_to_disk().await {
                            error!("snapshot failed: {e:#}");
                        }
                    }
                    _ = stop_rx.changed() => {
                        if let Err(e) = manager.save_to_disk().await {
                            error!("final snapshot failed: {e:#}");
                        }
                        break;
                    }
                }
            }
        });

        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Signals the loop to stop and waits for its final snapshot.
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(true);
        let handle = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Writes every non-expired entry to `<path>.tmp`, fsyncs, and renames it
    /// over `<path>`. The store is only touched while copying entries out;
    /// serialization and file IO run afterwards.
    pub async fn save_to_disk(&self) -> Result<()> {
        let _guard = self.save_lock.lock().await;

        let mut data: BTreeMap<String, PersistedEntry> = BTreeMap::new();
        for (key, entry) in self.cache.snapshot() {
            data.insert(
                key,
                PersistedEntry {
                    value: entry.value,
                    expiration: entry.expires_at,
                    last_access: entry.last_access,
                },
            );
        }
        let encoded = serde_json::to_vec(&data).context("failed to encode snapshot")?;

        let tmp_path = tmp_path(&self.file_path);
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .with_context(|| format!("failed to create {}", tmp_path.display()))?;
        file.write_all(&encoded)
            .await
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        file.sync_all()
            .await
            .with_context(|| format!("failed to sync {}", tmp_path.display()))?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.file_path)
            .await
            .with_context(|| format!("failed to install {}", self.file_path.display()))?;

        info!(
            "snapshot of {} entries written to {}",
            data.len(),
            self.file_path.display()
        );
        Ok(())
    }

    /// Loads the snapshot file if one exists. Entries already expired are
    /// dropped; the rest re-enter the store with an access count of one. An
    /// undecodable file is logged and treated as absent so the node can still
    /// start.
    pub async fn load_from_disk(&self) -> Result<()> {
        let _guard = self.save_lock.lock().await;

        if !self.file_path.exists() {
            info!(
                "no snapshot at {}, starting with an empty store",
                self.file_path.display()
            );
            return Ok(());
        }

        let raw = tokio::fs::read(&self.file_path)
            .await
            .with_context(|| format!("failed to read {}", self.file_path.display()))?;

        let data: BTreeMap<String, PersistedEntry> = match serde_json::from_slice(&raw) {
            Ok(data) => data,
            Err(e) => {
                error!(
                    "snapshot at {} is not decodable ({e}), starting with an empty store",
                    self.file_path.display()
                );
                return Ok(());
            }
        };

        let now = now_nanos();
        let mut entries = Vec::with_capacity(data.len());
        for (key, item) in data {
            if item.expiration > 0 && item.expiration <= now {
                continue;
            }
            entries.push((
                key,
                CacheEntry {
                    value: item.value,
                    expires_at: item.expiration,
                    last_access: item.last_access,
                    access_count: 1,
                },
            ));
        }

        let count = entries.len();
        self.cache.restore(entries);
        info!("restored {count} entries from {}", self.file_path.display());
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}
