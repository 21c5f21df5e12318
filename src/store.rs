//! Storage endpoint abstraction and its S3 implementation.
//!
//! The engine talks to both sides of a transfer through [`ObjectStore`], a
//! capability trait covering exactly the operations a bulk copy needs:
//! bucket reachability, paged listing, head, get, put, and the four
//! multipart calls. The source and destination are two instances of the
//! same implementation built with divergent auth configuration.

use crate::credentials::Credentials;
use crate::error::TransferError;
use crate::types::ObjectInfo;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials as AwsCredentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::pin::Pin;
use std::time::SystemTime;
use tokio::io::AsyncRead;

/// Streaming object body handed from a get to the copy loop.
pub type ObjectBody = Pin<Box<dyn AsyncRead + Send>>;

/// One page of a listing, bounded in memory by the service's page size.
#[derive(Debug, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectInfo>,
    /// Token for the next page; `None` on the last one.
    pub next_token: Option<String>,
}

/// An uploaded multipart part, as needed by the completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartInfo {
    pub part_number: i32,
    pub etag: String,
}

/// Capability surface of one storage endpoint (one bucket under one set of
/// credentials).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// The bucket this endpoint addresses.
    fn bucket(&self) -> &str;

    /// Checks the bucket is reachable with the endpoint's credentials.
    async fn bucket_exists(&self) -> Result<(), TransferError>;

    /// Fetches one listing page under `prefix`, continuing from `token`.
    async fn list_page(
        &self,
        prefix: &str,
        token: Option<String>,
    ) -> Result<ListPage, TransferError>;

    /// Returns the object's byte size, or `None` when it does not exist.
    async fn head_object(&self, key: &str) -> Result<Option<u64>, TransferError>;

    /// Opens the object body for streaming reads.
    async fn get_object(&self, key: &str) -> Result<ObjectBody, TransferError>;

    /// Writes one whole object in a single call.
    async fn put_object(&self, key: &str, body: Bytes) -> Result<(), TransferError>;

    /// Starts a multipart upload, returning its upload id.
    async fn create_multipart(&self, key: &str) -> Result<String, TransferError>;

    /// Uploads one numbered part, returning its etag.
    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String, TransferError>;

    /// Completes a multipart upload from the ordered part list.
    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartInfo],
    ) -> Result<(), TransferError>;

    /// Abandons a multipart upload so the backend can reclaim its parts.
    async fn abort_multipart(&self, key: &str, upload_id: &str) -> Result<(), TransferError>;
}

/// [`ObjectStore`] backed by the AWS SDK.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Builds an endpoint authenticated with explicit credentials, the way
    /// the source account is addressed.
    pub async fn with_credentials(bucket: impl Into<String>, creds: &Credentials) -> Self {
        let region = creds
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());
        let provider =
            AwsCredentials::new(&creds.access_key, &creds.secret_key, None, None, "s3ferry");
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(provider)
            .load()
            .await;
        Self {
            client: Client::new(&config),
            bucket: bucket.into(),
        }
    }

    /// Builds an endpoint on the default credential chain (instance
    /// profile, environment), the way the destination account is addressed.
    pub async fn with_region(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.into()))
            .load()
            .await;
        Self {
            client: Client::new(&config),
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> Result<(), TransferError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| TransferError::from_sdk(e, &self.bucket))?;
        Ok(())
    }

    async fn list_page(
        &self,
        prefix: &str,
        token: Option<String>,
    ) -> Result<ListPage, TransferError> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .set_continuation_token(token)
            .send()
            .await
            .map_err(|e| TransferError::from_sdk(e, &self.bucket))?;

        let objects = response
            .contents()
            .iter()
            .filter_map(|obj| {
                Some(ObjectInfo {
                    key: obj.key()?.to_string(),
                    size: obj.size().unwrap_or(0) as u64,
                    last_modified: obj
                        .last_modified()
                        .and_then(|dt| SystemTime::try_from(*dt).ok()),
                })
            })
            .collect();

        let next_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(|s| s.to_string())
        } else {
            None
        };

        Ok(ListPage {
            objects,
            next_token,
        })
    }

    async fn head_object(&self, key: &str) -> Result<Option<u64>, TransferError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => Ok(Some(response.content_length().unwrap_or(0) as u64)),
            Err(e) => match TransferError::from_sdk(e, &self.bucket) {
                TransferError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn get_object(&self, key: &str) -> Result<ObjectBody, TransferError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| TransferError::from_sdk(e, &self.bucket))?;
        Ok(Box::pin(response.body.into_async_read()))
    }

    async fn put_object(&self, key: &str, body: Bytes) -> Result<(), TransferError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| TransferError::from_sdk(e, &self.bucket))?;
        Ok(())
    }

    async fn create_multipart(&self, key: &str) -> Result<String, TransferError> {
        let response = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| TransferError::from_sdk(e, &self.bucket))?;
        response
            .upload_id()
            .map(|s| s.to_string())
            .ok_or_else(|| TransferError::Multipart("no upload id returned".to_string()))
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String, TransferError> {
        let response = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| TransferError::from_sdk(e, &self.bucket))?;
        response
            .e_tag()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                TransferError::Multipart(format!("no etag returned for part {}", part_number))
            })
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartInfo],
    ) -> Result<(), TransferError> {
        let completed: Vec<CompletedPart> = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(&p.etag)
                    .build()
            })
            .collect();
        let upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed))
            .build();
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(upload)
            .send()
            .await
            .map_err(|e| TransferError::from_sdk(e, &self.bucket))?;
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> Result<(), TransferError> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| TransferError::from_sdk(e, &self.bucket))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory [`ObjectStore`] for engine tests.

    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct PendingUpload {
        parts: HashMap<i32, (String, Vec<u8>)>,
    }

    /// A single-bucket store held in memory, with switches for injecting
    /// failures into gets and part uploads.
    #[derive(Default)]
    pub struct MemoryStore {
        bucket: String,
        objects: Mutex<HashMap<String, Vec<u8>>>,
        uploads: Mutex<HashMap<String, PendingUpload>>,
        aborted: Mutex<Vec<(String, String)>>,
        fail_gets: Mutex<HashSet<String>>,
        fail_part: Mutex<Option<(String, i32)>>,
        next_upload_id: AtomicUsize,
        get_calls: AtomicUsize,
        /// Maximum keys per listing page; `None` lists everything at once.
        pub page_size: Option<usize>,
    }

    impl MemoryStore {
        pub fn new(bucket: &str) -> Self {
            Self {
                bucket: bucket.to_string(),
                ..Default::default()
            }
        }

        pub fn insert(&self, key: &str, data: Vec<u8>) {
            self.objects.lock().unwrap().insert(key.to_string(), data);
        }

        pub fn object(&self, key: &str) -> Option<Vec<u8>> {
            self.objects.lock().unwrap().get(key).cloned()
        }

        pub fn object_count(&self) -> usize {
            self.objects.lock().unwrap().len()
        }

        /// Makes every get of `key` fail with a terminal transfer error.
        pub fn fail_gets_of(&self, key: &str) {
            self.fail_gets.lock().unwrap().insert(key.to_string());
        }

        /// Makes every upload of `part_number` for `key` fail.
        pub fn fail_part_upload(&self, key: &str, part_number: i32) {
            *self.fail_part.lock().unwrap() = Some((key.to_string(), part_number));
        }

        pub fn aborted_uploads(&self) -> Vec<(String, String)> {
            self.aborted.lock().unwrap().clone()
        }

        pub fn get_call_count(&self) -> usize {
            self.get_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        fn bucket(&self) -> &str {
            &self.bucket
        }

        async fn bucket_exists(&self) -> Result<(), TransferError> {
            Ok(())
        }

        async fn list_page(
            &self,
            prefix: &str,
            token: Option<String>,
        ) -> Result<ListPage, TransferError> {
            let objects = self.objects.lock().unwrap();
            let mut keys: Vec<&String> = objects
                .keys()
                .filter(|k| k.starts_with(prefix))
                .collect();
            keys.sort();

            let start = token
                .and_then(|t| t.parse::<usize>().ok())
                .unwrap_or(0);
            let page = self.page_size.unwrap_or(keys.len().max(1));
            let slice: Vec<ObjectInfo> = keys
                .iter()
                .skip(start)
                .take(page)
                .map(|k| ObjectInfo {
                    key: (*k).clone(),
                    size: objects[*k].len() as u64,
                    last_modified: None,
                })
                .collect();
            let next = start + slice.len();
            let next_token = if next < keys.len() {
                Some(next.to_string())
            } else {
                None
            };
            Ok(ListPage {
                objects: slice,
                next_token,
            })
        }

        async fn head_object(&self, key: &str) -> Result<Option<u64>, TransferError> {
            Ok(self
                .objects
                .lock()
                .unwrap()
                .get(key)
                .map(|d| d.len() as u64))
        }

        async fn get_object(&self, key: &str) -> Result<ObjectBody, TransferError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_gets.lock().unwrap().contains(key) {
                return Err(TransferError::ObjectTransfer {
                    key: key.to_string(),
                    message: "injected get failure".to_string(),
                });
            }
            let data = self
                .objects
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| TransferError::NotFound(format!("{}/{}", self.bucket, key)))?;
            Ok(Box::pin(std::io::Cursor::new(data)))
        }

        async fn put_object(&self, key: &str, body: Bytes) -> Result<(), TransferError> {
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), body.to_vec());
            Ok(())
        }

        async fn create_multipart(&self, _key: &str) -> Result<String, TransferError> {
            let id = format!("upload-{}", self.next_upload_id.fetch_add(1, Ordering::SeqCst));
            self.uploads
                .lock()
                .unwrap()
                .insert(id.clone(), PendingUpload::default());
            Ok(id)
        }

        async fn upload_part(
            &self,
            key: &str,
            upload_id: &str,
            part_number: i32,
            body: Bytes,
        ) -> Result<String, TransferError> {
            if let Some((fail_key, fail_part)) = self.fail_part.lock().unwrap().clone() {
                if fail_key == key && fail_part == part_number {
                    return Err(TransferError::ObjectTransfer {
                        key: key.to_string(),
                        message: format!("injected failure for part {}", part_number),
                    });
                }
            }
            let etag = format!("etag-{}", part_number);
            let mut uploads = self.uploads.lock().unwrap();
            let upload = uploads
                .get_mut(upload_id)
                .ok_or_else(|| TransferError::Multipart("unknown upload id".to_string()))?;
            upload
                .parts
                .insert(part_number, (etag.clone(), body.to_vec()));
            Ok(etag)
        }

        async fn complete_multipart(
            &self,
            key: &str,
            upload_id: &str,
            parts: &[PartInfo],
        ) -> Result<(), TransferError> {
            let upload = self
                .uploads
                .lock()
                .unwrap()
                .remove(upload_id)
                .ok_or_else(|| TransferError::Multipart("unknown upload id".to_string()))?;

            // Reject anything but a gapless 1..N ordering, as S3 would.
            let mut assembled = Vec::new();
            for (i, part) in parts.iter().enumerate() {
                if part.part_number != (i + 1) as i32 {
                    return Err(TransferError::Multipart(format!(
                        "part list not contiguous at index {}",
                        i
                    )));
                }
                let (etag, data) = upload.parts.get(&part.part_number).ok_or_else(|| {
                    TransferError::Multipart(format!("part {} never uploaded", part.part_number))
                })?;
                if *etag != part.etag {
                    return Err(TransferError::Multipart(format!(
                        "etag mismatch for part {}",
                        part.part_number
                    )));
                }
                assembled.extend_from_slice(data);
            }
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), assembled);
            Ok(())
        }

        async fn abort_multipart(&self, key: &str, upload_id: &str) -> Result<(), TransferError> {
            self.uploads.lock().unwrap().remove(upload_id);
            self.aborted
                .lock()
                .unwrap()
                .push((key.to_string(), upload_id.to_string()));
            Ok(())
        }
    }
}
