//! Pre-flight access probes for the source and destination buckets.
//!
//! Smoke tests only: they report reachability as a plain bool and log what
//! they find, leaving the exit-code decision to the caller.

use crate::error::TransferError;
use crate::store::{ObjectStore, PartInfo};
use bytes::Bytes;
use tracing::{error, info};

/// Key of the marker object the destination probe writes.
const PROBE_KEY: &str = ".s3ferry-access-test";

/// Key used for the destination probe's multipart round trip.
const PROBE_MULTIPART_KEY: &str = ".s3ferry-access-test-multipart";

/// Verifies the source bucket is reachable and listable.
///
/// Heads the bucket, then lists one page under `prefix` and logs the first
/// few keys, mirroring what the transfer's lister is about to do.
pub async fn probe_source(store: &dyn ObjectStore, prefix: &str) -> bool {
    info!("Testing access to source bucket: {}", store.bucket());

    if let Err(e) = store.bucket_exists().await {
        error!("✗ Cannot access source bucket '{}': {}", store.bucket(), e);
        if matches!(e, TransferError::AccessDenied { .. }) {
            error!("Please check:");
            error!("1. Source credentials are correct");
            error!("2. Source bucket name is correct");
            error!("3. Source credentials have s3:ListBucket permission");
        }
        return false;
    }
    info!("✓ Source bucket access successful");

    match store.list_page(prefix, None).await {
        Ok(page) if page.objects.is_empty() => {
            info!("✓ Bucket access successful, but no objects found with given prefix");
            true
        }
        Ok(page) => {
            info!("✓ Successfully listed {} objects", page.objects.len());
            for obj in page.objects.iter().take(5) {
                info!("  - {} ({} bytes)", obj.key, obj.size);
            }
            true
        }
        Err(e) => {
            error!("✗ Error listing objects: {}", e);
            false
        }
    }
}

/// Verifies the destination bucket accepts writes.
///
/// Heads the bucket, puts a small marker object, then runs a one-part
/// multipart round trip. The endpoint surface has no delete, so probe
/// artifacts are overwritten on the next probe rather than removed.
pub async fn probe_destination(store: &dyn ObjectStore) -> bool {
    info!("Testing access to destination bucket: {}", store.bucket());

    if let Err(e) = store.bucket_exists().await {
        error!(
            "✗ Cannot access destination bucket '{}': {}",
            store.bucket(),
            e
        );
        return false;
    }
    info!("✓ Destination bucket access successful");

    if let Err(e) = store
        .put_object(PROBE_KEY, Bytes::from_static(b"access test"))
        .await
    {
        error!("✗ Error uploading test object: {}", e);
        return false;
    }
    info!("✓ Successfully uploaded test object");

    match multipart_round_trip(store).await {
        Ok(()) => {
            info!("✓ Successfully tested multipart upload");
            true
        }
        Err(e) => {
            error!("✗ Error testing multipart upload: {}", e);
            false
        }
    }
}

async fn multipart_round_trip(store: &dyn ObjectStore) -> Result<(), TransferError> {
    let upload_id = store.create_multipart(PROBE_MULTIPART_KEY).await?;
    let upload = async {
        let etag = store
            .upload_part(
                PROBE_MULTIPART_KEY,
                &upload_id,
                1,
                Bytes::from_static(b"test part content"),
            )
            .await?;
        store
            .complete_multipart(
                PROBE_MULTIPART_KEY,
                &upload_id,
                &[PartInfo {
                    part_number: 1,
                    etag,
                }],
            )
            .await
    };
    match upload.await {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = store.abort_multipart(PROBE_MULTIPART_KEY, &upload_id).await;
            Err(e)
        }
    }
}
