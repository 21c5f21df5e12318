//! Data structures for transfer operations.

use crate::error::TransferError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Objects strictly larger than this are copied with the multipart
/// protocol; everything at or below it goes through a single put.
pub const MULTIPART_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Default size of one multipart chunk.
pub const DEFAULT_PART_SIZE: u64 = 8 * 1024 * 1024;

/// Default number of concurrent object transfers.
pub const DEFAULT_WORKER_COUNT: usize = 10;

/// Default path of the persisted progress ledger.
pub const DEFAULT_PROGRESS_FILE: &str = "transfer_progress.json";

/// One source object as enumerated by the lister.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Full key in the source bucket.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time, when the listing reports one.
    pub last_modified: Option<SystemTime>,
}

/// One completed transfer as remembered by the progress ledger.
///
/// Keyed by source key in the persisted mapping; created on success and
/// only ever overwritten whole.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    /// Byte size the object had when it was copied.
    pub size: u64,
    /// Completion time, RFC 3339.
    pub timestamp: String,
}

/// Per-object transfer strategy decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Already present (ledger record or destination object of equal size).
    Skip,
    /// Single get/put round trip.
    Simple,
    /// Chunked multipart upload.
    Multipart,
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferKind::Skip => write!(f, "skip"),
            TransferKind::Simple => write!(f, "simple"),
            TransferKind::Multipart => write!(f, "multipart"),
        }
    }
}

/// Result of one object's transfer attempt, consumed by the stats
/// aggregator in whatever order workers complete.
#[derive(Debug)]
pub struct TransferOutcome {
    pub key: String,
    pub size: u64,
    pub kind: TransferKind,
    pub error: Option<TransferError>,
}

impl TransferOutcome {
    pub fn succeeded(key: String, size: u64, kind: TransferKind) -> Self {
        Self {
            key,
            size,
            kind,
            error: None,
        }
    }

    pub fn failed(key: String, size: u64, kind: TransferKind, error: TransferError) -> Self {
        Self {
            key,
            size,
            kind,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Configuration for one transfer run. Immutable once built.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Source bucket name.
    pub source_bucket: String,
    /// Destination bucket name.
    pub dest_bucket: String,
    /// Source prefix (folder path), trailing `/` trimmed.
    pub source_prefix: String,
    /// Destination prefix (folder path), trailing `/` trimmed.
    pub dest_prefix: String,
    /// Number of concurrent object transfers.
    pub worker_count: usize,
    /// Multipart chunk size in bytes.
    pub part_size: u64,
    /// Objects above this size use the multipart protocol.
    pub multipart_threshold: u64,
    /// Path of the persisted progress ledger.
    pub progress_file: String,
}

impl TransferConfig {
    /// Builds a config for a bucket pair, normalizing the prefixes.
    pub fn new(source_bucket: impl Into<String>, dest_bucket: impl Into<String>) -> Self {
        Self {
            source_bucket: source_bucket.into(),
            dest_bucket: dest_bucket.into(),
            source_prefix: String::new(),
            dest_prefix: String::new(),
            worker_count: DEFAULT_WORKER_COUNT,
            part_size: DEFAULT_PART_SIZE,
            multipart_threshold: MULTIPART_THRESHOLD,
            progress_file: DEFAULT_PROGRESS_FILE.to_string(),
        }
    }

    /// Sets both prefixes, trimming trailing separators the way the key
    /// mapping expects them.
    pub fn with_prefixes(mut self, source_prefix: &str, dest_prefix: &str) -> Self {
        self.source_prefix = source_prefix.trim_end_matches('/').to_string();
        self.dest_prefix = dest_prefix.trim_end_matches('/').to_string();
        self
    }
}
