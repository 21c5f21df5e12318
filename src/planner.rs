//! Per-object transfer planning: skip detection and strategy selection.

use crate::progress::ProgressStore;
use crate::store::ObjectStore;
use crate::types::{ObjectInfo, TransferConfig, TransferKind};
use tracing::debug;

/// Maps a source key to its destination key.
///
/// Purely textual: strip the configured source prefix, trim a single
/// leading separator, then prepend the destination prefix.
pub fn destination_key(source_key: &str, source_prefix: &str, dest_prefix: &str) -> String {
    let relative = if source_prefix.is_empty() {
        source_key
    } else {
        source_key.strip_prefix(source_prefix).unwrap_or(source_key)
    };
    let relative = relative.strip_prefix('/').unwrap_or(relative);

    if dest_prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", dest_prefix, relative)
    }
}

/// Strategy selection from already-resolved facts. Pure: no I/O, no state.
///
/// The ledger wins over the destination: a record of the right size skips
/// the object even when the destination has since lost it.
pub fn classify_sizes(
    size: u64,
    ledger_size: Option<u64>,
    dest_size: Option<u64>,
    multipart_threshold: u64,
) -> TransferKind {
    if ledger_size == Some(size) || dest_size == Some(size) {
        return TransferKind::Skip;
    }
    if size > multipart_threshold {
        TransferKind::Multipart
    } else {
        TransferKind::Simple
    }
}

/// Decides how one object should be handled: consult the ledger, then head
/// the destination, then fall back to the size threshold.
///
/// A destination head failure is treated as "not present", so the object is
/// transferred rather than the run failing over a skip optimization.
pub async fn classify(
    obj: &ObjectInfo,
    progress: &ProgressStore,
    dest: &dyn ObjectStore,
    cfg: &TransferConfig,
) -> TransferKind {
    let ledger_size = progress.get(&obj.key).await.map(|r| r.size);
    if ledger_size == Some(obj.size) {
        return TransferKind::Skip;
    }

    let dest_key = destination_key(&obj.key, &cfg.source_prefix, &cfg.dest_prefix);
    let dest_size = match dest.head_object(&dest_key).await {
        Ok(size) => size,
        Err(e) => {
            debug!("Head of destination '{}' failed: {}", dest_key, e);
            None
        }
    };

    classify_sizes(obj.size, ledger_size, dest_size, cfg.multipart_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryStore;
    use crate::types::MULTIPART_THRESHOLD;

    #[test]
    fn maps_prefixed_key() {
        assert_eq!(
            destination_key("data/2024/file.csv", "data", "backup"),
            "backup/2024/file.csv"
        );
    }

    #[test]
    fn maps_without_prefixes() {
        assert_eq!(destination_key("file.csv", "", ""), "file.csv");
    }

    #[test]
    fn maps_source_prefix_only() {
        assert_eq!(destination_key("data/file.csv", "data", ""), "file.csv");
    }

    #[test]
    fn maps_dest_prefix_only() {
        assert_eq!(
            destination_key("file.csv", "", "backup"),
            "backup/file.csv"
        );
    }

    #[test]
    fn threshold_boundary_is_inclusive_of_simple() {
        assert_eq!(
            classify_sizes(MULTIPART_THRESHOLD, None, None, MULTIPART_THRESHOLD),
            TransferKind::Simple
        );
        assert_eq!(
            classify_sizes(MULTIPART_THRESHOLD + 1, None, None, MULTIPART_THRESHOLD),
            TransferKind::Multipart
        );
        assert_eq!(
            classify_sizes(0, None, None, MULTIPART_THRESHOLD),
            TransferKind::Simple
        );
    }

    #[test]
    fn ledger_match_skips() {
        assert_eq!(
            classify_sizes(42, Some(42), None, MULTIPART_THRESHOLD),
            TransferKind::Skip
        );
    }

    #[test]
    fn ledger_size_mismatch_does_not_skip() {
        assert_eq!(
            classify_sizes(42, Some(41), None, MULTIPART_THRESHOLD),
            TransferKind::Simple
        );
    }

    #[test]
    fn destination_match_skips() {
        assert_eq!(
            classify_sizes(42, None, Some(42), MULTIPART_THRESHOLD),
            TransferKind::Skip
        );
    }

    #[tokio::test]
    async fn ledger_wins_over_absent_destination() {
        let dir = tempfile::tempdir().unwrap();
        let progress = ProgressStore::load(dir.path().join("progress.json"));
        progress.record("data/k.bin", 100).await;

        // Destination has no such object; the ledger record still skips.
        let dest = MemoryStore::new("dst");
        let cfg = TransferConfig::new("src", "dst").with_prefixes("data", "backup");
        let obj = ObjectInfo {
            key: "data/k.bin".to_string(),
            size: 100,
            last_modified: None,
        };
        assert_eq!(
            classify(&obj, &progress, &dest, &cfg).await,
            TransferKind::Skip
        );
    }

    #[tokio::test]
    async fn live_destination_check_skips_without_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let progress = ProgressStore::load(dir.path().join("progress.json"));

        let dest = MemoryStore::new("dst");
        dest.insert("backup/k.bin", vec![0u8; 100]);
        let cfg = TransferConfig::new("src", "dst").with_prefixes("data", "backup");
        let obj = ObjectInfo {
            key: "data/k.bin".to_string(),
            size: 100,
            last_modified: None,
        };
        assert_eq!(
            classify(&obj, &progress, &dest, &cfg).await,
            TransferKind::Skip
        );
    }
}
