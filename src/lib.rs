//! s3ferry - Bulk S3 object transfer between AWS accounts with resumable progress
//!
//! This library copies every object under a prefix from one bucket to
//! another, across accounts with different credentials, and remembers what
//! it has already moved so an interrupted run picks up where it left off.
//!
//! # Features
//!
//! - **Resumable Transfers**: A persisted progress ledger makes reruns skip
//!   completed objects
//! - **Skip Detection**: Objects already present at the destination with a
//!   matching size are never re-copied
//! - **Multipart Uploads**: Large objects stream through the multipart
//!   protocol in fixed-size parts
//! - **Bounded Concurrency**: A fixed worker pool transfers many objects in
//!   parallel
//! - **Automatic Retry**: Transient transport failures retry with backoff;
//!   terminal 403/404 answers never do
//! - **Cancellation**: Ctrl-C propagates into the pool and aborts in-flight
//!   multipart uploads
//!
//! # Example
//!
//! ```no_run
//! use s3ferry::{load_credentials, run_transfer, S3Store, TransferConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), s3ferry::TransferError> {
//! let creds = load_credentials(std::path::Path::new("source_creds.json"))?;
//! let cfg = TransferConfig::new("source-bucket", "dest-bucket")
//!     .with_prefixes("data", "backup");
//!
//! let source = Arc::new(S3Store::with_credentials(&cfg.source_bucket, &creds).await);
//! let dest = Arc::new(S3Store::with_region(&cfg.dest_bucket, "us-east-1").await);
//!
//! let stats = run_transfer(&cfg, source, dest, CancellationToken::new()).await?;
//! println!("{} files failed", stats.failed_files);
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod error;
pub mod executor;
pub mod lister;
pub mod orchestrator;
pub mod planner;
pub mod probe;
pub mod progress;
pub mod stats;
pub mod store;
pub mod types;

pub use credentials::{load_credentials, Credentials};
pub use error::TransferError;
pub use lister::list_source_objects;
pub use orchestrator::run_transfer;
pub use planner::destination_key;
pub use probe::{probe_destination, probe_source};
pub use progress::ProgressStore;
pub use stats::{format_size, RunStats};
pub use store::{ObjectStore, S3Store};
pub use types::{
    ObjectInfo, TransferConfig, TransferKind, TransferOutcome, TransferRecord,
    DEFAULT_PART_SIZE, DEFAULT_PROGRESS_FILE, DEFAULT_WORKER_COUNT, MULTIPART_THRESHOLD,
};
