//! Persisted progress ledger for resumable transfers.

use crate::types::TransferRecord;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tracing::warn;

/// Mapping of source key to completed transfer, mirrored to disk after
/// every successful object.
///
/// All mutation goes through [`record`](ProgressStore::record), which holds
/// an async mutex across the load-modify-persist cycle so concurrent
/// workers can never interleave writes to the file.
pub struct ProgressStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, TransferRecord>>,
}

impl ProgressStore {
    /// Opens the ledger at `path`.
    ///
    /// A missing or unreadable file means starting fresh; that is logged as
    /// a warning, never treated as fatal.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Could not parse progress file {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("Could not load progress file {}: {}", path.display(), e);
                HashMap::new()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Remembers `key` as transferred at `size` bytes and rewrites the
    /// whole ledger file.
    ///
    /// A persistence failure is logged and swallowed: the object was
    /// copied, and forgetting it only costs a redundant skip-check on the
    /// next resume.
    pub async fn record(&self, key: &str, size: u64) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            TransferRecord {
                size,
                timestamp: humantime::format_rfc3339_seconds(SystemTime::now()).to_string(),
            },
        );
        match serde_json::to_string_pretty(&*entries) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    warn!("Could not save progress to {}: {}", self.path.display(), e);
                }
            }
            Err(e) => warn!("Could not serialize progress: {}", e),
        }
    }

    /// The recorded entry for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<TransferRecord> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Number of remembered transfers.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::load(dir.path().join("progress.json"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "not json {").unwrap();
        let store = ProgressStore::load(&path);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn record_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let store = ProgressStore::load(&path);
        store.record("data/a.bin", 1024).await;
        store.record("data/b.bin", 2048).await;

        let reloaded = ProgressStore::load(&path);
        assert_eq!(reloaded.len().await, 2);
        let rec = reloaded.get("data/a.bin").await.unwrap();
        assert_eq!(rec.size, 1024);
        assert!(humantime::parse_rfc3339(&rec.timestamp).is_ok());
    }

    #[tokio::test]
    async fn record_overwrites_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::load(dir.path().join("progress.json"));
        store.record("k", 10).await;
        store.record("k", 20).await;
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("k").await.unwrap().size, 20);
    }

    #[tokio::test]
    async fn concurrent_recorders_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        let store = Arc::new(ProgressStore::load(&path));

        let mut handles = Vec::new();
        for i in 0..20u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.record(&format!("key-{}", i), i).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let reloaded = ProgressStore::load(&path);
        assert_eq!(reloaded.len().await, 20);
    }
}
