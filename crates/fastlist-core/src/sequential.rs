//! Plain page-by-page listing.

use tracing::debug;

use crate::error::FastListResult;
use crate::source::{ObjectIter, ObjectSource};
use crate::types::{ObjectAttrs, Query};

/// Number of entries requested per page by the sequential lister.
pub const SEQ_DEFAULT_PAGE_SIZE: usize = 1000;

/// List `query` one page at a time starting at `page_token`.
///
/// Stops when the source runs out of pages or, when `batch_size > 0`, once at
/// least `batch_size` entries have been read. Whole pages are always
/// consumed, and directory objects count toward the batch size even when
/// they are dropped from the result. Returns the objects and the token to
/// resume from, `None` when the listing is complete.
pub async fn sequential_listing(
    source: &dyn ObjectSource,
    bucket: &str,
    query: &Query,
    page_token: Option<String>,
    batch_size: usize,
    skip_directory_objects: bool,
) -> FastListResult<(Vec<ObjectAttrs>, Option<String>)> {
    let mut pages = ObjectIter::resume(source, bucket, query.clone(), page_token, SEQ_DEFAULT_PAGE_SIZE);
    let mut objects = Vec::new();
    let mut read = 0;

    while let Some(page) = pages.next_page().await? {
        read += page.len();
        objects.extend(
            page.into_iter()
                .filter(|attrs| !(skip_directory_objects && attrs.is_directory(&query.delimiter))),
        );
        if pages.page_token().is_none() || (batch_size > 0 && read >= batch_size) {
            break;
        }
    }

    let next_token = pages.page_token().map(str::to_owned);
    debug!(
        bucket = %bucket,
        objects = objects.len(),
        more = next_token.is_some(),
        "sequential listing completed"
    );
    Ok((objects, next_token))
}
