//! Transfer execution: copy strategies and the bounded worker pool.

use crate::error::TransferError;
use crate::planner::{classify, destination_key};
use crate::progress::ProgressStore;
use crate::store::{ObjectBody, ObjectStore, PartInfo};
use crate::types::{ObjectInfo, TransferConfig, TransferKind, TransferOutcome};
use bytes::Bytes;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::Semaphore;
use tokio_retry2::strategy::{jitter, ExponentialBackoff};
use tokio_retry2::{Retry, RetryError};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Retries per object for transient transport failures.
const MAX_TRANSFER_RETRIES: usize = 3;

/// Reads up to `part_size` bytes from the body, short only at end of
/// stream.
async fn read_part(body: &mut ObjectBody, part_size: usize) -> Result<Bytes, std::io::Error> {
    let mut buf = vec![0u8; part_size];
    let mut filled = 0;
    while filled < part_size {
        let n = body.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(Bytes::from(buf))
}

/// Copies one object with a full-body get and a single put.
async fn copy_simple(
    source: &dyn ObjectStore,
    dest: &dyn ObjectStore,
    source_key: &str,
    dest_key: &str,
    size: u64,
) -> Result<(), TransferError> {
    let mut body = source.get_object(source_key).await?;
    let mut buf = Vec::with_capacity(size as usize);
    body.read_to_end(&mut buf).await?;
    dest.put_object(dest_key, Bytes::from(buf)).await
}

/// Copies one object through the multipart protocol.
///
/// The source body is streamed sequentially in `part_size` chunks, each
/// uploaded as the next numbered part; on any failure or cancellation the
/// upload is aborted best-effort so the backend does not keep charging for
/// orphaned parts.
async fn copy_multipart(
    source: &dyn ObjectStore,
    dest: &dyn ObjectStore,
    source_key: &str,
    dest_key: &str,
    part_size: u64,
    cancel: &CancellationToken,
) -> Result<(), TransferError> {
    let mut body = source.get_object(source_key).await?;
    let upload_id = dest.create_multipart(dest_key).await?;

    match upload_parts(dest, &mut body, dest_key, &upload_id, part_size, cancel).await {
        Ok(()) => Ok(()),
        Err(e) => {
            // Best-effort cleanup; the object failure is what gets reported.
            if let Err(abort_err) = dest.abort_multipart(dest_key, &upload_id).await {
                warn!(
                    "Could not abort multipart upload {} for '{}': {}",
                    upload_id, dest_key, abort_err
                );
            }
            Err(e)
        }
    }
}

async fn upload_parts(
    dest: &dyn ObjectStore,
    body: &mut ObjectBody,
    dest_key: &str,
    upload_id: &str,
    part_size: u64,
    cancel: &CancellationToken,
) -> Result<(), TransferError> {
    let mut parts = Vec::new();
    let mut part_number = 1i32;

    loop {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        let chunk = read_part(body, part_size as usize).await?;
        if chunk.is_empty() {
            break;
        }
        let etag = dest
            .upload_part(dest_key, upload_id, part_number, chunk)
            .await?;
        parts.push(PartInfo { part_number, etag });
        part_number += 1;
    }

    dest.complete_multipart(dest_key, upload_id, &parts).await
}

/// Runs one object start to finish: classify, copy with bounded retry,
/// record in the ledger.
///
/// Every attempt is independent and position-less: a retried multipart
/// starts a fresh upload rather than resuming the aborted one.
async fn transfer_object(
    source: &dyn ObjectStore,
    dest: &dyn ObjectStore,
    progress: &ProgressStore,
    cfg: &TransferConfig,
    obj: &ObjectInfo,
    cancel: &CancellationToken,
) -> TransferOutcome {
    if cancel.is_cancelled() {
        let kind = if obj.size > cfg.multipart_threshold {
            TransferKind::Multipart
        } else {
            TransferKind::Simple
        };
        return TransferOutcome::failed(obj.key.clone(), obj.size, kind, TransferError::Cancelled);
    }

    let kind = classify(obj, progress, dest, cfg).await;
    if kind == TransferKind::Skip {
        info!("Skipping already transferred file: {}", obj.key);
        return TransferOutcome::succeeded(obj.key.clone(), obj.size, kind);
    }

    let dest_key = destination_key(&obj.key, &cfg.source_prefix, &cfg.dest_prefix);
    let retry_strategy = ExponentialBackoff::from_millis(2)
        .factor(500)
        .max_delay(Duration::from_secs(30))
        .map(jitter)
        .take(MAX_TRANSFER_RETRIES);

    let result = Retry::spawn(retry_strategy, || {
        let source_key = obj.key.clone();
        let dest_key = dest_key.clone();
        let size = obj.size;
        let part_size = cfg.part_size;

        async move {
            let attempt = match kind {
                TransferKind::Simple => {
                    copy_simple(source, dest, &source_key, &dest_key, size).await
                }
                TransferKind::Multipart => {
                    copy_multipart(source, dest, &source_key, &dest_key, part_size, cancel).await
                }
                TransferKind::Skip => unreachable!("skip handled before dispatch"),
            };
            match attempt {
                Ok(()) => Ok(()),
                Err(e) if e.is_transient() => {
                    warn!("Transient failure transferring {}: {}", source_key, e);
                    RetryError::to_transient(e)
                }
                Err(e) => RetryError::to_permanent(e),
            }
        }
    })
    .await;

    match result {
        Ok(()) => {
            info!(
                "Transferred {} file: {} -> {} ({} bytes)",
                kind, obj.key, dest_key, obj.size
            );
            progress.record(&obj.key, obj.size).await;
            TransferOutcome::succeeded(obj.key.clone(), obj.size, kind)
        }
        Err(e) => {
            error!("Error transferring {}: {}", obj.key, e);
            TransferOutcome::failed(obj.key.clone(), obj.size, kind, e)
        }
    }
}

/// Dispatches the whole enumerated set to a fixed-size worker pool and
/// drains every outcome.
///
/// One spawned task per object, concurrency bounded by a semaphore sized
/// to `worker_count`; outcomes come back in completion order.
pub async fn execute_all(
    source: Arc<dyn ObjectStore>,
    dest: Arc<dyn ObjectStore>,
    progress: Arc<ProgressStore>,
    cfg: Arc<TransferConfig>,
    objects: Vec<ObjectInfo>,
    cancel: CancellationToken,
    pb: indicatif::ProgressBar,
) -> Vec<TransferOutcome> {
    let semaphore = Arc::new(Semaphore::new(cfg.worker_count));
    let mut tasks = FuturesUnordered::new();

    for obj in objects {
        let semaphore = Arc::clone(&semaphore);
        let source = Arc::clone(&source);
        let dest = Arc::clone(&dest);
        let progress = Arc::clone(&progress);
        let cfg = Arc::clone(&cfg);
        let cancel = cancel.clone();
        let pb = pb.clone();
        let key = obj.key.clone();
        let size = obj.size;

        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire().await.unwrap();
            pb.set_message(format!("| ⬇️  {}", obj.key));
            let outcome = transfer_object(&*source, &*dest, &progress, &cfg, &obj, &cancel).await;
            pb.inc(1);
            outcome
        });
        tasks.push(async move { (key, size, handle.await) });
    }

    let mut outcomes = Vec::new();
    while let Some((key, size, joined)) = tasks.next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Worker for '{}' failed to complete: {}", key, e);
                TransferOutcome::failed(
                    key.clone(),
                    size,
                    TransferKind::Simple,
                    TransferError::ObjectTransfer {
                        key,
                        message: format!("worker task failed: {}", e),
                    },
                )
            }
        };
        outcomes.push(outcome);
    }
    outcomes
}
