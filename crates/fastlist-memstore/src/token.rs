//! Page token encoding.
//!
//! A page token records the last entry a page returned, so the next page
//! resumes strictly after it. Tokens are base64 so they stay opaque to
//! callers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use fastlist_core::SourceError;

/// Position of the last entry returned by a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// A concrete object version.
    Object {
        /// Object name.
        name: String,
        /// Version of the object.
        generation: i64,
    },
    /// A collapsed delimiter prefix; every name under it was covered.
    Prefix(String),
}

impl Cursor {
    /// Whether the entry `(name, generation)` was already returned.
    #[must_use]
    pub fn covers(&self, name: &str, generation: i64) -> bool {
        match self {
            Self::Object {
                name: last,
                generation: last_generation,
            } => name < last.as_str() || (name == last && generation <= *last_generation),
            Self::Prefix(prefix) => name <= prefix.as_str() || name.starts_with(prefix.as_str()),
        }
    }

    /// Lowest name that may still need listing.
    #[must_use]
    pub fn lower_bound(&self) -> &str {
        match self {
            Self::Object { name, .. } | Self::Prefix(name) => name,
        }
    }
}

/// Encode a cursor as an opaque page token.
#[must_use]
pub fn encode_page_token(cursor: &Cursor) -> String {
    let raw = match cursor {
        Cursor::Object { name, generation } => format!("o:{generation}:{name}"),
        Cursor::Prefix(prefix) => format!("p:{prefix}"),
    };
    BASE64_STANDARD.encode(raw.as_bytes())
}

/// Decode a page token produced by [`encode_page_token`].
///
/// # Errors
///
/// Returns [`SourceError::InvalidPageToken`] if the token is not valid base64,
/// not UTF-8, or not a cursor.
pub fn decode_page_token(token: &str) -> Result<Cursor, SourceError> {
    let invalid = || SourceError::InvalidPageToken {
        token: token.to_owned(),
    };
    let bytes = BASE64_STANDARD.decode(token).map_err(|_| invalid())?;
    let raw = String::from_utf8(bytes).map_err(|_| invalid())?;

    if let Some(prefix) = raw.strip_prefix("p:") {
        return Ok(Cursor::Prefix(prefix.to_owned()));
    }
    let rest = raw.strip_prefix("o:").ok_or_else(invalid)?;
    let (generation, name) = rest.split_once(':').ok_or_else(invalid)?;
    Ok(Cursor::Object {
        name: name.to_owned(),
        generation: generation.parse().map_err(|_| invalid())?,
    })
}
