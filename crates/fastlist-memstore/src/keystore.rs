//! Object name storage with versioning support.
//!
//! Uses a `BTreeMap` so names are always sorted, which listing relies on for
//! offsets, prefixes and page tokens.

use std::collections::BTreeMap;
use std::ops::Bound;

use chrono::{DateTime, Utc};
use fastlist_core::{ObjectAttrs, Projection, Query};

use crate::token::Cursor;

/// One page of a listing, before token encoding.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Entries in listing order.
    pub items: Vec<ObjectAttrs>,
    /// Position of the last entry when more entries remain.
    pub next: Option<Cursor>,
}

/// Objects of one bucket, keyed by name.
///
/// Each name maps to its versions in ascending generation order. The last
/// version is live unless it carries a `deleted` time.
#[derive(Debug, Default)]
pub struct KeyStore {
    objects: BTreeMap<String, Vec<ObjectAttrs>>,
    versioned: bool,
}

impl KeyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(versioned: bool) -> Self {
        Self {
            objects: BTreeMap::new(),
            versioned,
        }
    }

    /// Whether old versions are kept.
    #[must_use]
    pub fn is_versioned(&self) -> bool {
        self.versioned
    }

    /// Store a new version of an object.
    ///
    /// Returns the version it replaced as live, if any. In a versioned store
    /// that version is kept with `deleted` set to the new version's time.
    pub fn put(&mut self, attrs: ObjectAttrs) -> Option<ObjectAttrs> {
        let now = attrs.updated.unwrap_or_else(Utc::now);
        let versions = self.objects.entry(attrs.name.clone()).or_default();
        if !self.versioned {
            let previous = versions.pop();
            versions.clear();
            versions.push(attrs);
            return previous.filter(|v| v.deleted.is_none());
        }
        let previous = versions.last_mut().filter(|v| v.deleted.is_none()).map(|v| {
            v.deleted = Some(now);
            v.clone()
        });
        versions.push(attrs);
        previous
    }

    /// Remove the live version of an object.
    ///
    /// Versioned stores keep it as a non-current version.
    pub fn delete(&mut self, name: &str, now: DateTime<Utc>) -> Option<ObjectAttrs> {
        if !self.versioned {
            return self.objects.remove(name).and_then(|mut v| v.pop());
        }
        let live = self
            .objects
            .get_mut(name)?
            .last_mut()
            .filter(|v| v.deleted.is_none())?;
        live.deleted = Some(now);
        Some(live.clone())
    }

    /// The live version of an object.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ObjectAttrs> {
        self.objects.get(name).and_then(|versions| live(versions))
    }

    /// Number of objects with a live version.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.values().filter(|v| live(v).is_some()).count()
    }

    /// Whether no object has a live version.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored versions, live or not.
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.objects.values().map(Vec::len).sum()
    }

    /// List up to `max_entries` entries matching `query`, resuming after
    /// `after`.
    ///
    /// `start_offset` is inclusive and `end_offset` exclusive. With a
    /// delimiter, names containing it after the prefix collapse into one
    /// entry whose `prefix` holds the common part. With `versions`, every
    /// version is listed in ascending generation, otherwise only live ones.
    #[must_use]
    pub fn list(&self, bucket: &str, query: &Query, after: Option<&Cursor>, max_entries: usize) -> ListPage {
        let max_entries = max_entries.max(1);
        let mut lower = query.start_offset.as_str().max(query.prefix.as_str());
        if let Some(cursor) = after {
            lower = lower.max(cursor.lower_bound());
        }

        let mut entries: Vec<(ObjectAttrs, Cursor)> = Vec::new();
        'names: for (name, versions) in self
            .objects
            .range::<str, _>((Bound::Included(lower), Bound::Unbounded))
        {
            if !query.end_offset.is_empty() && name.as_str() >= query.end_offset.as_str() {
                break;
            }
            if !name.starts_with(&query.prefix) {
                break;
            }

            let visible: Vec<&ObjectAttrs> = if query.versions {
                versions.iter().collect()
            } else {
                live(versions).into_iter().collect()
            };
            if visible.is_empty() {
                continue;
            }

            if let Some(common) = common_prefix(name, &query.prefix, &query.delimiter) {
                let emitted = matches!(entries.last(), Some((_, Cursor::Prefix(p))) if p == common);
                if emitted || after.is_some_and(|c| c.covers(name, i64::MAX)) {
                    continue;
                }
                let entry = ObjectAttrs {
                    bucket: bucket.to_owned(),
                    prefix: common.to_owned(),
                    ..ObjectAttrs::default()
                };
                entries.push((entry, Cursor::Prefix(common.to_owned())));
                if entries.len() > max_entries {
                    break;
                }
                continue;
            }

            for version in visible {
                if after.is_some_and(|c| c.covers(name, version.generation)) {
                    continue;
                }
                let cursor = Cursor::Object {
                    name: name.clone(),
                    generation: version.generation,
                };
                entries.push((select_attrs(version, query), cursor));
                if entries.len() > max_entries {
                    break 'names;
                }
            }
        }

        let next = if entries.len() > max_entries {
            entries.truncate(max_entries);
            entries.last().map(|(_, cursor)| cursor.clone())
        } else {
            None
        };
        ListPage {
            items: entries.into_iter().map(|(attrs, _)| attrs).collect(),
            next,
        }
    }
}

fn live(versions: &[ObjectAttrs]) -> Option<&ObjectAttrs> {
    versions.last().filter(|v| v.deleted.is_none())
}

/// The collapsed prefix `name` falls under, if the delimiter occurs after
/// `prefix`.
fn common_prefix<'a>(name: &'a str, prefix: &str, delimiter: &str) -> Option<&'a str> {
    if delimiter.is_empty() {
        return None;
    }
    let rest = name.strip_prefix(prefix)?;
    rest.find(delimiter)
        .map(|pos| &name[..prefix.len() + pos + delimiter.len()])
}

/// Copy `attrs`, clearing the attributes the query did not select.
///
/// Name, prefix and bucket are always kept. The owner is dropped under
/// [`Projection::NoAcl`].
fn select_attrs(attrs: &ObjectAttrs, query: &Query) -> ObjectAttrs {
    let mut out = attrs.clone();
    if query.projection == Projection::NoAcl {
        out.owner = None;
    }
    if query.attr_selection.is_none() {
        return out;
    }
    if !query.selects("Generation") {
        out.generation = 0;
    }
    if !query.selects("Metageneration") {
        out.metageneration = 0;
    }
    if !query.selects("Size") {
        out.size = 0;
    }
    if !query.selects("Etag") {
        out.etag = None;
    }
    if !query.selects("ContentType") {
        out.content_type = None;
    }
    if !query.selects("Updated") {
        out.updated = None;
    }
    if !query.selects("Deleted") {
        out.deleted = None;
    }
    if !query.selects("Owner") {
        out.owner = None;
    }
    out
}
