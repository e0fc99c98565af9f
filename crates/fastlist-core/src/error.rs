//! Error types for fast listing.
//!
//! [`SourceError`] is what an [`ObjectSource`](crate::source::ObjectSource)
//! implementation reports; [`ListError`] is what the splitter, the page
//! fetcher and the [`Lister`](crate::lister::Lister) return to callers.

/// Error reported by the paginated listing collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The bucket being listed does not exist.
    #[error("bucket does not exist: {bucket}")]
    NoSuchBucket {
        /// The bucket name that was not found.
        bucket: String,
    },

    /// The page token handed back to the source was not issued by it.
    #[error("invalid page token: {token}")]
    InvalidPageToken {
        /// The rejected token.
        token: String,
    },

    /// The backend could not serve the request.
    #[error("listing backend unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Core error type for fast listing.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    /// An argument provided is invalid.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// The listing collaborator failed.
    #[error("{context}: {source}")]
    Source {
        /// What the lister was doing when the source failed.
        context: String,
        /// The underlying source error.
        #[source]
        source: SourceError,
    },

    /// The listing was cancelled through the lister's cancellation token.
    #[error("listing cancelled")]
    Cancelled,

    /// The lister was closed.
    #[error("lister is closed")]
    Closed,

    /// An earlier call failed and the ranges it held were abandoned.
    #[error("lister failed in an earlier call; create a new lister to retry")]
    Poisoned,

    /// A worker task panicked or was aborted.
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ListError {
    /// Build an [`ListError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Wrap a [`SourceError`] with context.
    pub fn source(context: impl Into<String>, source: SourceError) -> Self {
        Self::Source {
            context: context.into(),
            source,
        }
    }

    /// Whether this error is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Convenience result type for fast listing operations.
pub type FastListResult<T> = Result<T, ListError>;
