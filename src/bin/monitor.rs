//! Live monitor for a running bulk transfer.
//!
//! Reads only the persisted progress ledger; it never talks to S3 and can
//! run on a different terminal (or machine sharing the file) than the
//! transfer itself.

use anyhow::{Context, Result};
use clap::Parser;
use s3ferry::{format_size, TransferRecord, DEFAULT_PROGRESS_FILE};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

#[derive(Parser, Debug)]
#[command(name = "s3ferry-monitor")]
#[command(about = "Monitor S3 bulk transfer progress", long_about = None)]
#[command(version)]
struct Args {
    /// Path of the progress ledger file
    #[arg(long, default_value = DEFAULT_PROGRESS_FILE)]
    progress_file: PathBuf,

    /// Seconds between display refreshes
    #[arg(long, default_value_t = 5)]
    interval: u64,

    /// Show transfer summary and exit
    #[arg(long)]
    summary: bool,
}

fn load_progress(path: &Path) -> HashMap<String, TransferRecord> {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            eprintln!("Error parsing progress: {}", e);
            HashMap::new()
        }),
        Err(_) => HashMap::new(),
    }
}

fn show_summary(path: &Path) -> Result<()> {
    let progress = load_progress(path);
    if progress.is_empty() {
        println!("No transfer progress found.");
        return Ok(());
    }

    let total_files = progress.len();
    let total_bytes: u64 = progress.values().map(|r| r.size).sum();

    let mut timestamps = Vec::with_capacity(progress.len());
    for record in progress.values() {
        let ts = humantime::parse_rfc3339(&record.timestamp)
            .context("invalid timestamp in progress file")?;
        timestamps.push(ts);
    }
    let first = timestamps.iter().min().copied().unwrap_or(SystemTime::UNIX_EPOCH);
    let last = timestamps.iter().max().copied().unwrap_or(first);
    let duration = last.duration_since(first).unwrap_or(Duration::ZERO);

    println!("Transfer Summary");
    println!("{}", "=".repeat(50));
    println!("Total files: {}", total_files);
    println!("Total size: {}", format_size(total_bytes));
    println!("Duration: {}", humantime::format_duration(duration));
    if duration.as_secs() > 0 {
        let avg = total_bytes as f64 / duration.as_secs_f64();
        println!("Average speed: {}/s", format_size(avg as u64));
    }
    println!("{}", "=".repeat(50));
    Ok(())
}

fn render(path: &Path, last_count: &mut usize, last_bytes: &mut u64, last_tick: &mut Instant) {
    let progress = load_progress(path);
    let count = progress.len();
    let bytes: u64 = progress.values().map(|r| r.size).sum();

    let elapsed = last_tick.elapsed().as_secs_f64();
    let (speed, files_per_sec) = if elapsed > 0.0 {
        (
            bytes.saturating_sub(*last_bytes) as f64 / elapsed,
            count.saturating_sub(*last_count) as f64 / elapsed,
        )
    } else {
        (0.0, 0.0)
    };

    // ANSI clear-screen-and-home, so the display refreshes in place.
    print!("\x1b[2J\x1b[H");
    println!("S3 Transfer Monitor");
    println!("{}", "=".repeat(50));
    println!("Files transferred: {}", count);
    println!("Total size: {}", format_size(bytes));
    println!("Transfer speed: {}/s", format_size(speed as u64));
    println!("Files per second: {:.2}", files_per_sec);
    println!("{}", "=".repeat(50));

    if !progress.is_empty() {
        println!();
        println!("Recent transfers:");
        // RFC 3339 timestamps in one format sort correctly as strings.
        let mut entries: Vec<(&String, &TransferRecord)> = progress.iter().collect();
        entries.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));
        for (key, record) in entries.into_iter().take(10) {
            let time_of_day = record.timestamp.get(11..19).unwrap_or(&record.timestamp);
            println!(
                "  {} ({}) - {}",
                key,
                format_size(record.size),
                time_of_day
            );
        }
    }

    *last_count = count;
    *last_bytes = bytes;
    *last_tick = Instant::now();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.summary {
        return show_summary(&args.progress_file);
    }

    println!("S3 Transfer Monitor");
    println!("{}", "=".repeat(50));

    // Seed the deltas so the first refresh shows rates, not history.
    let initial = load_progress(&args.progress_file);
    let mut last_count = initial.len();
    let mut last_bytes: u64 = initial.values().map(|r| r.size).sum();
    let mut last_tick = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Monitoring stopped.");
                return Ok(());
            }
            _ = ticker.tick() => {
                render(&args.progress_file, &mut last_count, &mut last_bytes, &mut last_tick);
            }
        }
    }
}
