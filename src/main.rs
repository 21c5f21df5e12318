use clap::Parser;
use s3ferry::{
    load_credentials, probe_destination, probe_source, run_transfer, ObjectStore, S3Store,
    TransferConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "s3ferry")]
#[command(about = "Bulk S3 transfer between AWS accounts", long_about = None)]
#[command(version)]
struct Args {
    /// Path to source credentials JSON file
    #[arg(long)]
    source_credentials: PathBuf,

    /// AWS region for destination bucket
    #[arg(long)]
    dest_region: String,

    /// Source S3 bucket name
    #[arg(long)]
    source_bucket: String,

    /// Destination S3 bucket name
    #[arg(long)]
    dest_bucket: String,

    /// Source prefix (folder path)
    #[arg(long, default_value = "")]
    source_prefix: String,

    /// Destination prefix (folder path)
    #[arg(long, default_value = "")]
    dest_prefix: String,

    /// Number of concurrent transfers
    #[arg(long, default_value_t = s3ferry::DEFAULT_WORKER_COUNT)]
    max_workers: usize,

    /// Multipart upload chunk size in bytes
    #[arg(long, default_value_t = s3ferry::DEFAULT_PART_SIZE)]
    chunk_size: u64,

    /// Objects above this many bytes use multipart upload
    #[arg(long, default_value_t = s3ferry::MULTIPART_THRESHOLD)]
    multipart_threshold: u64,

    /// Path of the progress ledger file
    #[arg(long, default_value = s3ferry::DEFAULT_PROGRESS_FILE)]
    progress_file: String,

    /// Test source bucket access before starting transfer
    #[arg(long)]
    test_access: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("s3ferry={}", log_level))
        .init();

    info!("🚀 s3ferry - S3 bulk transfer");
    info!("Source: s3://{}/{}", args.source_bucket, args.source_prefix);
    info!(
        "Destination: s3://{}/{} ({})",
        args.dest_bucket, args.dest_prefix, args.dest_region
    );

    let creds = match load_credentials(&args.source_credentials) {
        Ok(creds) => creds,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    };

    let cfg = {
        let mut cfg = TransferConfig::new(&args.source_bucket, &args.dest_bucket)
            .with_prefixes(&args.source_prefix, &args.dest_prefix);
        cfg.worker_count = args.max_workers;
        cfg.part_size = args.chunk_size;
        cfg.multipart_threshold = args.multipart_threshold;
        cfg.progress_file = args.progress_file;
        cfg
    };

    let source: Arc<dyn ObjectStore> =
        Arc::new(S3Store::with_credentials(&cfg.source_bucket, &creds).await);
    let dest: Arc<dyn ObjectStore> =
        Arc::new(S3Store::with_region(&cfg.dest_bucket, &args.dest_region).await);

    // Ctrl-C cancels the pool; in-flight multipart uploads abort themselves.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling transfer...");
                cancel.cancel();
            }
        });
    }

    if args.test_access {
        info!("Testing bucket access...");
        if !probe_source(&*source, &cfg.source_prefix).await {
            error!("Source access test failed. Please fix the issues above before proceeding.");
            std::process::exit(1);
        }
        if !probe_destination(&*dest).await {
            error!("Destination access test failed. Please fix the issues above before proceeding.");
            std::process::exit(1);
        }
        info!("Access tests passed. Proceeding with transfer...");
    }

    match run_transfer(&cfg, source, dest, cancel).await {
        Ok(stats) if stats.failed_files == 0 => {
            info!("✅ Transfer completed successfully!");
        }
        Ok(stats) => {
            error!("❌ Transfer completed with {} failed objects!", stats.failed_files);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}
