//! End-to-end listing tests for fastlist.
//!
//! Every test builds its own [`MemoryStore`], fills a bucket and lists it
//! through the public [`Lister`](fastlist_core::Lister) API, so nothing
//! external needs to be running.
//!
//! Run them with:
//! ```text
//! cargo test -p fastlist-integration
//! ```

use std::sync::{Arc, Once};

use fastlist_core::{ListerInput, ListingMethod, ObjectAttrs, ObjectSource, Query};
use fastlist_memstore::MemoryStore;

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Zero-padded object name, so numeric and lexicographic order agree.
#[must_use]
pub fn object_name(prefix: &str, index: usize) -> String {
    format!("{prefix}obj{index:06}")
}

/// Create a bucket holding `count` objects named by [`object_name`], each
/// written `versions` times. More than one version makes the bucket versioned.
#[must_use]
pub fn populated_store(prefix: &str, count: usize, versions: usize) -> (Arc<MemoryStore>, String) {
    init_tracing();

    let store = Arc::new(MemoryStore::new());
    let bucket = test_bucket_name("list");
    store
        .create_bucket(&bucket, versions > 1)
        .unwrap_or_else(|e| panic!("failed to create bucket {bucket}: {e}"));
    for i in 0..count {
        let name = object_name(prefix, i);
        for version in 0..versions.max(1) {
            store
                .put_object(&bucket, &name, format!("{name}@{version}").as_bytes())
                .unwrap_or_else(|e| panic!("failed to put {name}: {e}"));
        }
    }
    (store, bucket)
}

/// Lister input for `bucket` with the given method and parallelism.
#[must_use]
pub fn lister_input(bucket: &str, query: Query, method: ListingMethod, parallelism: usize) -> ListerInput {
    ListerInput::builder()
        .bucket_name(bucket)
        .query(query)
        .method(method)
        .parallelism(parallelism)
        .build()
}

/// Upcast a store for [`Lister::new`](fastlist_core::Lister::new).
#[must_use]
pub fn as_source(store: &Arc<MemoryStore>) -> Arc<dyn ObjectSource> {
    Arc::clone(store) as Arc<dyn ObjectSource>
}

/// Sorted `(name, generation)` pairs, for order-independent comparison.
#[must_use]
pub fn sorted_keys(objects: &[ObjectAttrs]) -> Vec<(String, i64)> {
    let mut keys: Vec<(String, i64)> = objects
        .iter()
        .map(|o| (o.name.clone(), o.generation))
        .collect();
    keys.sort();
    keys
}

mod test_batches;
mod test_errors;
mod test_filters;
mod test_lister;
mod test_versions;
