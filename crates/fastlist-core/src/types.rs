//! Shared data types for fast listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{FastListResult, ListError};

/// Delimiter assumed for directory objects when the query sets none.
pub const DEFAULT_DIRECTORY_DELIMITER: &str = "/";

/// Attribute names accepted by [`Query::set_attr_selection`].
pub const ATTR_NAMES: &[&str] = &[
    "Bucket",
    "Name",
    "Prefix",
    "Generation",
    "Metageneration",
    "Size",
    "Etag",
    "ContentType",
    "Updated",
    "Deleted",
    "Owner",
];

/// Metadata of one listed object.
///
/// Delimiter listings also yield synthetic entries whose `name` is empty and
/// whose `prefix` carries the collapsed common prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectAttrs {
    /// Bucket the object lives in.
    pub bucket: String,
    /// Full object name.
    pub name: String,
    /// Common prefix, set only for synthetic delimiter entries.
    pub prefix: String,
    /// Version number; `0` when unknown or not selected.
    pub generation: i64,
    /// Metadata version number.
    pub metageneration: i64,
    /// Object size in bytes.
    pub size: u64,
    /// Entity tag of the object content.
    pub etag: Option<String>,
    /// MIME type.
    pub content_type: Option<String>,
    /// Last modification time.
    pub updated: Option<DateTime<Utc>>,
    /// Time the version stopped being live, set on non-current versions.
    pub deleted: Option<DateTime<Utc>>,
    /// Entity owning the object; sources leave it out under
    /// [`Projection::NoAcl`].
    pub owner: Option<String>,
}

impl ObjectAttrs {
    /// Create attributes carrying only a bucket and a name.
    #[must_use]
    pub fn named(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether this entry is a directory placeholder object.
    #[must_use]
    pub fn is_directory(&self, delimiter: &str) -> bool {
        let delimiter = if delimiter.is_empty() {
            DEFAULT_DIRECTORY_DELIMITER
        } else {
            delimiter
        };
        self.name.ends_with(delimiter)
    }
}

/// How much metadata the source should return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Projection {
    /// All properties.
    #[default]
    Full,
    /// All properties except access control lists.
    NoAcl,
}

/// Filter for a listing.
///
/// `start_offset` is inclusive and `end_offset` exclusive; empty means
/// unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Only list names beginning with this prefix.
    #[builder(default, setter(into))]
    pub prefix: String,
    /// Collapse names containing the delimiter after the prefix.
    #[builder(default, setter(into))]
    pub delimiter: String,
    /// Lowest name to list, inclusive.
    #[builder(default, setter(into))]
    pub start_offset: String,
    /// Name to stop before, exclusive.
    #[builder(default, setter(into))]
    pub end_offset: String,
    /// List every version of each object instead of only the live one.
    #[builder(default)]
    pub versions: bool,
    /// Metadata projection. Sources drop the owner and access control data
    /// under [`Projection::NoAcl`], which makes pages smaller.
    #[builder(default)]
    pub projection: Projection,
    /// Attributes to populate; `None` means all.
    #[builder(default, setter(strip_option))]
    pub attr_selection: Option<Vec<String>>,
}

impl Query {
    /// Restrict the attributes the source populates.
    ///
    /// Names are those in [`ATTR_NAMES`].
    pub fn set_attr_selection(&mut self, attrs: &[&str]) -> FastListResult<()> {
        if let Some(unknown) = attrs.iter().find(|a| !ATTR_NAMES.contains(a)) {
            return Err(ListError::invalid_argument(format!(
                "unknown object attribute: {unknown}"
            )));
        }
        self.attr_selection = Some(attrs.iter().map(|a| (*a).to_owned()).collect());
        Ok(())
    }

    /// Whether the given attribute is populated by listings with this query.
    #[must_use]
    pub fn selects(&self, attr: &str) -> bool {
        self.attr_selection
            .as_ref()
            .is_none_or(|selected| selected.iter().any(|a| a == attr))
    }
}

/// A half-open `[start, end)` range of prefix-relative names.
///
/// An empty bound is unbounded on that side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListRange {
    /// Inclusive lower bound.
    pub start: String,
    /// Exclusive upper bound.
    pub end: String,
}

impl ListRange {
    /// Create a new range.
    #[must_use]
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Whether the range cannot contain any name.
    ///
    /// A range is empty when both bounds are set and `end <= start`; an
    /// unbounded range is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.end.is_empty() && self.end <= self.start
    }
}

/// Result of fetching one page for a range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextPageResult {
    /// Objects listed in the page, minus the held-back cursor object.
    pub items: Vec<ObjectAttrs>,
    /// Whether the range is exhausted.
    pub done_listing: bool,
    /// Prefix-relative name to resume from.
    pub next_start_range: String,
    /// Generation of the held-back object when listing versions.
    pub generation: i64,
}

/// One batch returned by [`Lister::next_batch`](crate::lister::Lister::next_batch).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBatch {
    /// Objects listed in this batch.
    pub objects: Vec<ObjectAttrs>,
    /// Whether the listing is complete; no later batch will return objects.
    pub done: bool,
}
