//! Top-level store state.
//!
//! [`MemoryStore`] manages the collection of buckets and serves listings
//! through [`ObjectSource`]. All operations are thread-safe via `DashMap`.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use fastlist_core::{ListRequest, ObjectAttrs, ObjectPage, ObjectSource, SourceError};
use md5::{Digest, Md5};
use parking_lot::RwLock;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use crate::error::{StoreError, StoreResult};
use crate::keystore::KeyStore;
use crate::token::{decode_page_token, encode_page_token};

/// Content type recorded for stored objects.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Owner recorded for stored objects.
pub const DEFAULT_OWNER: &str = "project-owners";

/// Fault and latency injection for listing calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, TypedBuilder)]
pub struct StoreOptions {
    /// Delay applied before every listing page.
    #[builder(default, setter(strip_option))]
    pub latency: Option<Duration>,

    /// Number of listing calls served before every later call fails with
    /// [`SourceError::Unavailable`].
    #[builder(default, setter(strip_option))]
    pub fail_after: Option<usize>,
}

/// In-memory bucket store.
pub struct MemoryStore {
    /// Bucket name to object storage mapping.
    buckets: DashMap<String, KeyStore>,
    /// Source of object generations, shared by all buckets.
    next_generation: AtomicI64,
    /// Listing calls served so far.
    list_calls: AtomicUsize,
    options: RwLock<StoreOptions>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("bucket_count", &self.buckets.len())
            .field("list_calls", &self.list_calls.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    /// Create a new, empty store with injected faults or latency.
    #[must_use]
    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            buckets: DashMap::new(),
            next_generation: AtomicI64::new(1),
            list_calls: AtomicUsize::new(0),
            options: RwLock::new(options),
        }
    }

    /// Replace the injected faults or latency.
    pub fn set_options(&self, options: StoreOptions) {
        *self.options.write() = options;
    }

    /// Create a new bucket.
    ///
    /// # Errors
    ///
    /// - [`StoreError::BucketAlreadyExists`] if the name is taken.
    pub fn create_bucket(&self, name: &str, versioned: bool) -> StoreResult<()> {
        if self.buckets.contains_key(name) {
            return Err(StoreError::BucketAlreadyExists {
                bucket: name.to_owned(),
            });
        }
        self.buckets.insert(name.to_owned(), KeyStore::new(versioned));
        info!(bucket = %name, versioned, "bucket created");
        Ok(())
    }

    /// Delete a bucket and everything in it.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NoSuchBucket`] if the bucket does not exist.
    pub fn delete_bucket(&self, name: &str) -> StoreResult<()> {
        self.buckets.remove(name).ok_or_else(|| StoreError::NoSuchBucket {
            bucket: name.to_owned(),
        })?;
        info!(bucket = %name, "bucket deleted");
        Ok(())
    }

    /// Store `data` under `name`, returning the new version's attributes.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NoSuchBucket`] if the bucket does not exist.
    /// - [`StoreError::InvalidObjectName`] if the name is empty.
    pub fn put_object(&self, bucket: &str, name: &str, data: &[u8]) -> StoreResult<ObjectAttrs> {
        if name.is_empty() {
            return Err(StoreError::InvalidObjectName {
                name: name.to_owned(),
            });
        }
        let mut store = self.buckets.get_mut(bucket).ok_or_else(|| StoreError::NoSuchBucket {
            bucket: bucket.to_owned(),
        })?;

        let attrs = ObjectAttrs {
            bucket: bucket.to_owned(),
            name: name.to_owned(),
            prefix: String::new(),
            generation: self.next_generation.fetch_add(1, Ordering::SeqCst),
            metageneration: 1,
            size: data.len() as u64,
            etag: Some(compute_md5(data)),
            content_type: Some(DEFAULT_CONTENT_TYPE.to_owned()),
            updated: Some(Utc::now()),
            deleted: None,
            owner: Some(DEFAULT_OWNER.to_owned()),
        };
        store.put(attrs.clone());
        debug!(bucket = %bucket, name = %name, generation = attrs.generation, "put_object completed");
        Ok(attrs)
    }

    /// Remove the live version of an object.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NoSuchBucket`] if the bucket does not exist.
    /// - [`StoreError::NoSuchKey`] if the object has no live version.
    pub fn delete_object(&self, bucket: &str, name: &str) -> StoreResult<()> {
        let mut store = self.buckets.get_mut(bucket).ok_or_else(|| StoreError::NoSuchBucket {
            bucket: bucket.to_owned(),
        })?;
        store
            .delete(name, Utc::now())
            .ok_or_else(|| StoreError::NoSuchKey { key: name.to_owned() })?;
        debug!(bucket = %bucket, name = %name, "delete_object completed");
        Ok(())
    }

    /// Number of objects with a live version in a bucket.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NoSuchBucket`] if the bucket does not exist.
    pub fn object_count(&self, bucket: &str) -> StoreResult<usize> {
        self.buckets
            .get(bucket)
            .map(|store| store.len())
            .ok_or_else(|| StoreError::NoSuchBucket {
                bucket: bucket.to_owned(),
            })
    }

    /// Number of listing calls served so far, failed ones included.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Serve one listing page without latency or fault injection.
    ///
    /// # Errors
    ///
    /// - [`SourceError::NoSuchBucket`] if the bucket does not exist.
    /// - [`SourceError::InvalidPageToken`] if the token was not issued here.
    pub fn list_page(&self, request: &ListRequest) -> Result<ObjectPage, SourceError> {
        let store = self
            .buckets
            .get(&request.bucket)
            .ok_or_else(|| SourceError::NoSuchBucket {
                bucket: request.bucket.clone(),
            })?;
        let after = request
            .page_token
            .as_deref()
            .map(decode_page_token)
            .transpose()?;

        let page = store.list(&request.bucket, &request.query, after.as_ref(), request.page_size);
        debug!(
            bucket = %request.bucket,
            start = %request.query.start_offset,
            end = %request.query.end_offset,
            items = page.items.len(),
            truncated = page.next.is_some(),
            "list_objects completed"
        );
        Ok(ObjectPage {
            items: page.items,
            next_page_token: page.next.as_ref().map(encode_page_token),
        })
    }
}

#[async_trait]
impl ObjectSource for MemoryStore {
    async fn list_objects(&self, request: &ListRequest) -> Result<ObjectPage, SourceError> {
        let options = self.options.read().clone();
        let served = self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = options.latency {
            tokio::time::sleep(latency).await;
        }
        if options.fail_after.is_some_and(|limit| served >= limit) {
            return Err(SourceError::Unavailable {
                message: format!("injected failure after {served} listing calls"),
            });
        }
        self.list_page(request)
    }
}

/// Hex-encoded MD5 digest of `data`.
#[must_use]
pub fn compute_md5(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}
