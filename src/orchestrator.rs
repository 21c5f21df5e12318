//! Main orchestration logic for a bulk transfer run.

use crate::error::TransferError;
use crate::executor::execute_all;
use crate::lister::list_source_objects;
use crate::progress::ProgressStore;
use crate::stats::{format_size, RunStats};
use crate::store::ObjectStore;
use crate::types::TransferConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs one bulk transfer to completion.
///
/// Enumerates the source, dispatches every object to the worker pool, and
/// blocks until all outcomes drain. The returned stats carry the failure
/// count the caller turns into an exit code; per-object failures never
/// abort the batch, only listing-level errors do.
///
/// # Example
///
/// ```no_run
/// use s3ferry::{run_transfer, S3Store, TransferConfig};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), s3ferry::TransferError> {
/// let creds = s3ferry::load_credentials(std::path::Path::new("creds.json"))?;
/// let cfg = TransferConfig::new("source-bucket", "dest-bucket");
/// let source = Arc::new(S3Store::with_credentials(&cfg.source_bucket, &creds).await);
/// let dest = Arc::new(S3Store::with_region(&cfg.dest_bucket, "us-east-1").await);
/// let stats = run_transfer(&cfg, source, dest, CancellationToken::new()).await?;
/// assert_eq!(stats.failed_files, 0);
/// # Ok(())
/// # }
/// ```
pub async fn run_transfer(
    cfg: &TransferConfig,
    source: Arc<dyn ObjectStore>,
    dest: Arc<dyn ObjectStore>,
    cancel: CancellationToken,
) -> Result<RunStats, TransferError> {
    info!(
        "Starting bulk transfer: {} -> {}",
        cfg.source_bucket, cfg.dest_bucket
    );

    let progress = Arc::new(ProgressStore::load(&cfg.progress_file));
    if !progress.is_empty().await {
        info!(
            "Resuming: {} transfers already recorded in {}",
            progress.len().await,
            cfg.progress_file
        );
    }

    let objects = list_source_objects(&*source, &cfg.source_prefix).await?;
    if objects.is_empty() {
        return Err(TransferError::NotFound(format!(
            "no objects to transfer in '{}' under prefix '{}'",
            cfg.source_bucket, cfg.source_prefix
        )));
    }

    let total_bytes: u64 = objects.iter().map(|o| o.size).sum();
    let mut stats = RunStats::start(objects.len(), total_bytes);
    info!("Total files to transfer: {}", objects.len());
    info!("Total size to transfer: {}", format_size(total_bytes));

    let pb = if atty::is(atty::Stream::Stderr) {
        let pb = indicatif::ProgressBar::new(objects.len() as u64);
        pb.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg} | {elapsed_precise} elapsed, ETA {eta_precise}")
                .unwrap()
                .progress_chars("█▓▒░ "),
        );
        pb.set_message(format!("📦 Transferring {} objects", objects.len()));
        pb
    } else {
        indicatif::ProgressBar::hidden()
    };

    let outcomes = execute_all(
        source,
        dest,
        Arc::clone(&progress),
        Arc::new(cfg.clone()),
        objects,
        cancel,
        pb.clone(),
    )
    .await;

    for outcome in &outcomes {
        stats.record(outcome);
    }
    stats.finish();

    if stats.failed_files == 0 {
        pb.finish_with_message("✅ All objects transferred");
    } else {
        pb.finish_with_message(format!("❌ {} objects failed", stats.failed_files));
    }
    stats.log_summary();

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryStore;

    fn cfg_with_dir(dir: &tempfile::TempDir) -> TransferConfig {
        let mut cfg = TransferConfig::new("src", "dst");
        cfg.progress_file = dir
            .path()
            .join("progress.json")
            .to_string_lossy()
            .into_owned();
        cfg
    }

    #[tokio::test]
    async fn full_run_transfers_everything() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cfg_with_dir(&dir);
        let source = Arc::new(MemoryStore::new("src"));
        let dest = Arc::new(MemoryStore::new("dst"));
        source.insert("a", vec![1u8; 10]);
        source.insert("b", vec![2u8; 20]);

        let stats = run_transfer(
            &cfg,
            Arc::clone(&source) as Arc<dyn ObjectStore>,
            Arc::clone(&dest) as Arc<dyn ObjectStore>,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.transferred_files, 2);
        assert_eq!(stats.failed_files, 0);
        assert_eq!(stats.transferred_bytes, 30);
        assert_eq!(dest.object_count(), 2);
    }

    #[tokio::test]
    async fn rerun_with_ledger_moves_no_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cfg_with_dir(&dir);
        let source = Arc::new(MemoryStore::new("src"));
        let dest = Arc::new(MemoryStore::new("dst"));
        source.insert("a", vec![1u8; 10]);
        source.insert("b", vec![2u8; 20]);

        for expected_bytes in [30u64, 0u64] {
            let stats = run_transfer(
                &cfg,
                Arc::clone(&source) as Arc<dyn ObjectStore>,
                Arc::clone(&dest) as Arc<dyn ObjectStore>,
                CancellationToken::new(),
            )
            .await
            .unwrap();
            assert_eq!(stats.transferred_files, stats.total_files);
            assert_eq!(stats.transferred_bytes, expected_bytes);
            assert_eq!(stats.failed_files, 0);
        }
    }

    #[tokio::test]
    async fn empty_source_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cfg_with_dir(&dir);
        let source = Arc::new(MemoryStore::new("src"));
        let dest = Arc::new(MemoryStore::new("dst"));

        let err = run_transfer(
            &cfg,
            source as Arc<dyn ObjectStore>,
            dest as Arc<dyn ObjectStore>,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TransferError::NotFound(_)));
    }
}
