//! Fetching one page of a range.
//!
//! A page is read for `[start_range, end_range)` and the lexicographically
//! last entry of the page is held back: its name becomes the cursor for the
//! next page of the same range, which keeps every name owned by exactly one
//! range no matter how the unread remainder is split afterwards.

use tracing::debug;

use crate::error::FastListResult;
use crate::source::{ObjectIter, ObjectSource};
use crate::types::{NextPageResult, Query};

/// Number of entries read per page by work-stealing workers.
pub const WS_DEFAULT_PAGE_SIZE: usize = 1000;

/// Parameters of a single page fetch.
#[derive(Debug, Clone, Default)]
pub struct NextPageOpts {
    /// Bucket to list.
    pub bucket: String,
    /// Base query; its offsets are replaced by the range bounds.
    pub query: Query,
    /// Prefix-relative inclusive lower bound, empty for unbounded.
    pub start_range: String,
    /// Prefix-relative exclusive upper bound, empty for unbounded.
    pub end_range: String,
    /// Drop directory placeholder objects from the returned items.
    pub skip_directory_objects: bool,
    /// Generation of the object at `start_range` returned by the previous
    /// page; lower generations of that name were already listed.
    pub generation: i64,
}

/// Read the next page of a range.
///
/// With versions enabled, a page that consists only of versions of the
/// cursor object is extended until a different name appears, so the cursor
/// always advances.
pub async fn next_page(source: &dyn ObjectSource, opts: NextPageOpts) -> FastListResult<NextPageResult> {
    let NextPageOpts {
        bucket,
        mut query,
        start_range,
        end_range,
        skip_directory_objects,
        generation,
    } = opts;

    query.start_offset = add_prefix(&start_range, &query.prefix);
    query.end_offset = add_prefix(&end_range, &query.prefix);
    let versions = query.versions;
    let start_offset = query.start_offset.clone();
    let prefix = query.prefix.clone();
    let delimiter = query.delimiter.clone();
    let mut objects = ObjectIter::new(source, &bucket, query, WS_DEFAULT_PAGE_SIZE);

    let mut items = Vec::new();
    let mut name_lex_last = String::new();
    // Index of the lexicographically last entry in `items`, `None` when that
    // entry was read but not kept.
    let mut index_lex_last: Option<usize> = None;

    let mut count = 0;
    while count < WS_DEFAULT_PAGE_SIZE {
        let Some(attrs) = objects.next().await? else {
            debug!(
                bucket = %bucket,
                start = %start_range,
                end = %end_range,
                items = items.len(),
                "range exhausted"
            );
            return Ok(NextPageResult {
                items,
                done_listing: true,
                next_start_range: String::new(),
                generation: 0,
            });
        };
        let last_slot = count == WS_DEFAULT_PAGE_SIZE - 1;
        count += 1;

        // Versions are returned in ascending generation; these were already
        // returned by the previous page.
        if versions && attrs.name == start_offset && attrs.generation < generation {
            continue;
        }

        let keep = !(skip_directory_objects && attrs.is_directory(&delimiter));
        if name_lex_last <= attrs.name || name_lex_last <= attrs.prefix {
            name_lex_last = if attrs.prefix <= attrs.name {
                attrs.name.clone()
            } else {
                attrs.prefix.clone()
            };
            index_lex_last = keep.then_some(items.len());
        }

        let same_object_page = versions && last_slot && attrs.generation != 0 && attrs.name == start_offset;
        let unknown_generation = attrs.generation == 0;
        if keep {
            items.push(attrs);
        }
        let repeated_name = versions
            && last_slot
            && unknown_generation
            && index_lex_last.is_some_and(|i| i > 0 && items.get(i - 1).map(|a| &a.name) == items.get(i).map(|a| &a.name));

        if same_object_page || repeated_name {
            count = 0;
        }
    }

    let next_start_range = name_lex_last
        .strip_prefix(prefix.as_str())
        .unwrap_or(&name_lex_last)
        .to_owned();

    let mut held_generation = 0;
    if let Some(index) = index_lex_last {
        if !items.is_empty() {
            let held = if index + 1 >= items.len() {
                items.pop()
            } else {
                Some(items.remove(index))
            };
            held_generation = held.map_or(0, |a| a.generation);
        }
    }
    if !versions {
        held_generation = 0;
    }

    debug!(
        bucket = %bucket,
        start = %start_range,
        end = %end_range,
        next_start = %next_start_range,
        items = items.len(),
        "page listed"
    );

    Ok(NextPageResult {
        items,
        done_listing: false,
        next_start_range,
        generation: held_generation,
    })
}

/// Prepend `prefix` to a non-empty range bound.
pub(crate) fn add_prefix(name: &str, prefix: &str) -> String {
    if name.is_empty() {
        String::new()
    } else {
        format!("{prefix}{name}")
    }
}
