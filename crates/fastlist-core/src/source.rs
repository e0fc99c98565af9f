//! The paginated listing collaborator.
//!
//! Fast listing never talks to a storage service directly. It issues
//! [`ListRequest`]s against an [`ObjectSource`], which returns one page of
//! objects in ascending name order (and ascending generation within a name
//! when versions are requested) together with an opaque continuation token.

use std::collections::VecDeque;
use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::{FastListResult, ListError, SourceError};
use crate::types::{ObjectAttrs, Query};

/// One page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Bucket to list.
    pub bucket: String,
    /// Filter applied by the source.
    pub query: Query,
    /// Token returned with the previous page, `None` for the first page.
    pub page_token: Option<String>,
    /// Maximum number of entries the page may hold.
    pub page_size: usize,
}

/// One page of listing results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    /// Entries in listing order.
    pub items: Vec<ObjectAttrs>,
    /// Token for the next page, `None` when the listing is exhausted.
    pub next_page_token: Option<String>,
}

/// A paginated object listing service.
#[async_trait]
pub trait ObjectSource: Send + Sync + Debug {
    /// Fetch one page of objects matching `request`.
    async fn list_objects(&self, request: &ListRequest) -> Result<ObjectPage, SourceError>;
}

/// Pulls objects one at a time from an [`ObjectSource`], fetching pages on
/// demand.
#[derive(Debug)]
pub struct ObjectIter<'a> {
    source: &'a dyn ObjectSource,
    request: ListRequest,
    buffer: VecDeque<ObjectAttrs>,
    exhausted: bool,
}

impl<'a> ObjectIter<'a> {
    /// Start iterating from the beginning of `query`.
    #[must_use]
    pub fn new(source: &'a dyn ObjectSource, bucket: &str, query: Query, page_size: usize) -> Self {
        Self::resume(source, bucket, query, None, page_size)
    }

    /// Continue an earlier listing from `page_token`.
    #[must_use]
    pub fn resume(
        source: &'a dyn ObjectSource,
        bucket: &str,
        query: Query,
        page_token: Option<String>,
        page_size: usize,
    ) -> Self {
        Self {
            source,
            request: ListRequest {
                bucket: bucket.to_owned(),
                query,
                page_token,
                page_size,
            },
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Next object, or `None` once the listing is exhausted.
    pub async fn next(&mut self) -> FastListResult<Option<ObjectAttrs>> {
        loop {
            if let Some(attrs) = self.buffer.pop_front() {
                return Ok(Some(attrs));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    /// Fetch the next page and return it whole, bypassing the item buffer.
    ///
    /// Returns `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> FastListResult<Option<Vec<ObjectAttrs>>> {
        if !self.buffer.is_empty() {
            return Ok(Some(self.buffer.drain(..).collect()));
        }
        if self.exhausted {
            return Ok(None);
        }
        self.fetch_page().await?;
        Ok(Some(self.buffer.drain(..).collect()))
    }

    /// Token that resumes the listing after everything returned so far, if
    /// the buffer is drained.
    #[must_use]
    pub fn page_token(&self) -> Option<&str> {
        self.request.page_token.as_deref()
    }

    async fn fetch_page(&mut self) -> FastListResult<()> {
        let page = self
            .source
            .list_objects(&self.request)
            .await
            .map_err(|e| ListError::source("iterating through objects", e))?;
        self.buffer.extend(page.items);
        self.exhausted = page.next_page_token.is_none();
        self.request.page_token = page.next_page_token;
        Ok(())
    }
}
