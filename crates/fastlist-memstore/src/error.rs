//! Store management errors.

/// Error returned by bucket and object management on a [`MemoryStore`].
///
/// Listing errors are reported as [`fastlist_core::SourceError`] through the
/// [`ObjectSource`](fastlist_core::ObjectSource) implementation instead.
///
/// [`MemoryStore`]: crate::MemoryStore
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The specified bucket does not exist.
    #[error("The specified bucket does not exist: {bucket}")]
    NoSuchBucket {
        /// The bucket name that was not found.
        bucket: String,
    },

    /// A bucket with this name already exists.
    #[error("The requested bucket name is not available: {bucket}")]
    BucketAlreadyExists {
        /// The bucket name that already exists.
        bucket: String,
    },

    /// The object has no live version.
    #[error("The specified key does not exist: {key}")]
    NoSuchKey {
        /// The object name that was not found.
        key: String,
    },

    /// The object name is not acceptable.
    #[error("Invalid object name: {name:?}")]
    InvalidObjectName {
        /// The rejected name.
        name: String,
    },
}

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
