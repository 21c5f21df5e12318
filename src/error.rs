//! Error types for transfer operations.

use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use std::io;
use thiserror::Error;

/// Errors that can occur during transfer operations.
#[derive(Error, Debug)]
pub enum TransferError {
    /// I/O error during ledger or file operations.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    /// Credentials file missing, unparseable, or incomplete.
    #[error("Invalid credentials: {0}")]
    Credentials(String),

    /// Listing/head/bucket-level access denied. Fatal for the run when it
    /// prevents enumeration of the source.
    #[error("Access denied to bucket '{bucket}': {message}")]
    AccessDenied { bucket: String, message: String },

    /// Bucket or object does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single object's copy failed. Local to that object; the run
    /// continues with the rest of the batch.
    #[error("Transfer of '{key}' failed: {message}")]
    ObjectTransfer { key: String, message: String },

    /// Failure within the multipart upload protocol (missing upload id,
    /// missing part etag, completion rejected).
    #[error("Multipart upload error: {0}")]
    Multipart(String),

    /// Transport-level failure (connect, dispatch, response, timeout).
    /// The only kind considered transient for retry purposes.
    #[error("Network error: {0}")]
    Network(String),

    /// The run was cancelled before this operation completed.
    #[error("Operation cancelled")]
    Cancelled,
}

impl TransferError {
    /// Whether a bounded retry with backoff is worth attempting.
    ///
    /// Terminal service answers (403/404) and cancellation must never be
    /// retried; only transport-level failures are.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransferError::Network(_))
    }

    /// Maps an AWS SDK error onto the transfer taxonomy.
    ///
    /// Service errors are classified by their S3 error code; anything that
    /// never produced a service response (dispatch failure, malformed
    /// response, timeout) is a transient network error.
    pub(crate) fn from_sdk<E>(err: SdkError<E>, bucket: &str) -> Self
    where
        E: std::error::Error + ProvideErrorMetadata + Send + Sync + 'static,
    {
        match &err {
            SdkError::ServiceError(ctx) => {
                let message = ctx
                    .err()
                    .message()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.to_string());
                // HEAD answers carry no error body, so fall back to the
                // HTTP status when no error code was parsed.
                let status = ctx.raw().status().as_u16();
                match (ctx.err().code(), status) {
                    (Some("AccessDenied") | Some("Forbidden"), _) | (None, 403) => {
                        TransferError::AccessDenied {
                            bucket: bucket.to_string(),
                            message,
                        }
                    }
                    (Some("NoSuchKey") | Some("NoSuchBucket") | Some("NotFound"), _)
                    | (None, 404) => TransferError::NotFound(format!("{}: {}", bucket, message)),
                    (code, _) => TransferError::ObjectTransfer {
                        key: bucket.to_string(),
                        message: format!("{}: {}", code.unwrap_or("Unknown"), message),
                    },
                }
            }
            SdkError::DispatchFailure(_)
            | SdkError::ResponseError(_)
            | SdkError::TimeoutError(_) => TransferError::Network(err.to_string()),
            _ => TransferError::Network(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_are_transient() {
        assert!(TransferError::Network("connection reset".to_string()).is_transient());
    }

    #[test]
    fn terminal_errors_are_not_transient() {
        assert!(!TransferError::AccessDenied {
            bucket: "b".to_string(),
            message: "denied".to_string()
        }
        .is_transient());
        assert!(!TransferError::NotFound("b/k".to_string()).is_transient());
        assert!(!TransferError::Cancelled.is_transient());
        assert!(!TransferError::ObjectTransfer {
            key: "k".to_string(),
            message: "bad".to_string()
        }
        .is_transient());
    }
}
