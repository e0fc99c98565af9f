//! In-memory bucket store for fastlist.
//!
//! [`MemoryStore`] keeps buckets of (optionally versioned) objects in memory
//! and implements [`fastlist_core::ObjectSource`] with the listing rules fast
//! listing expects: inclusive start offset, exclusive end offset, prefix and
//! delimiter filtering, ascending generations when listing versions,
//! attribute selection and opaque page tokens. Latency and failures can be
//! injected for testing.
//!
//! ```
//! use fastlist_memstore::MemoryStore;
//!
//! let store = MemoryStore::new();
//! store.create_bucket("photos", false).unwrap();
//! store.put_object("photos", "2024/cat.png", b"meow").unwrap();
//! assert_eq!(store.object_count("photos").unwrap(), 1);
//! ```

pub mod error;
pub mod keystore;
pub mod service;
pub mod token;

pub use error::{StoreError, StoreResult};
pub use service::{MemoryStore, StoreOptions};
