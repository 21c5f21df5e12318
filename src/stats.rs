//! Run statistics and human-readable size formatting.

use crate::types::{TransferKind, TransferOutcome};
use std::time::{Duration, Instant};
use tracing::info;

/// Counters for one transfer run.
///
/// Outcomes arrive in whatever order workers finish; the totals are only
/// authoritative once every submitted object has resolved. Skipped objects
/// count as transferred files (they are present at the destination) but
/// contribute no transferred bytes.
#[derive(Debug)]
pub struct RunStats {
    pub total_files: usize,
    pub transferred_files: usize,
    pub skipped_files: usize,
    pub failed_files: usize,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    started_at: Instant,
    elapsed: Option<Duration>,
}

impl RunStats {
    /// Starts the clock for a run over `total_files` objects totalling
    /// `total_bytes`.
    pub fn start(total_files: usize, total_bytes: u64) -> Self {
        Self {
            total_files,
            transferred_files: 0,
            skipped_files: 0,
            failed_files: 0,
            total_bytes,
            transferred_bytes: 0,
            started_at: Instant::now(),
            elapsed: None,
        }
    }

    /// Folds one outcome into the counters.
    pub fn record(&mut self, outcome: &TransferOutcome) {
        if !outcome.is_success() {
            self.failed_files += 1;
            return;
        }
        self.transferred_files += 1;
        match outcome.kind {
            TransferKind::Skip => self.skipped_files += 1,
            TransferKind::Simple | TransferKind::Multipart => {
                self.transferred_bytes += outcome.size
            }
        }
    }

    /// Stops the clock.
    pub fn finish(&mut self) {
        self.elapsed = Some(self.started_at.elapsed());
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started_at.elapsed())
    }

    /// Average throughput in bytes per second, zero when no time has
    /// measurably passed.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > f64::EPSILON {
            self.transferred_bytes as f64 / secs
        } else {
            0.0
        }
    }

    /// Logs the end-of-run summary. Always printed, success or not.
    pub fn log_summary(&self) {
        info!("==================================================");
        info!("TRANSFER SUMMARY");
        info!("==================================================");
        info!("Total files: {}", self.total_files);
        info!(
            "Transferred files: {} ({} skipped)",
            self.transferred_files, self.skipped_files
        );
        info!("Failed files: {}", self.failed_files);
        info!("Total size: {}", format_size(self.total_bytes));
        info!("Transferred size: {}", format_size(self.transferred_bytes));
        info!(
            "Duration: {}",
            humantime::format_duration(Duration::from_secs(self.elapsed().as_secs()))
        );
        info!("Average speed: {}/s", format_size(self.throughput() as u64));
        info!("==================================================");
    }
}

/// Formats a byte count with binary unit steps and two decimals.
///
/// Zero renders as `"0B"`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }

    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
