//! Lister configuration.
//!
//! Provides [`ListerConfig`], the tunables shared by every [`Lister`]
//! created from it. Values are loaded from environment variables.
//!
//! [`Lister`]: crate::lister::Lister

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::splitter::DEFAULT_ALPHABET;

/// Fast listing configuration.
///
/// # Examples
///
/// ```
/// use fastlist_core::config::ListerConfig;
///
/// let config = ListerConfig::default();
/// assert_eq!(config.parallelism, 0);
/// assert_eq!(config.batch_size, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ListerConfig {
    /// Number of concurrent workers; `0` picks ten per available CPU.
    #[builder(default = 0)]
    pub parallelism: usize,

    /// Minimum objects per batch; `0` lists everything in one batch.
    #[builder(default = 0)]
    pub batch_size: usize,

    /// Whether directory placeholder objects are dropped from results.
    #[builder(default = false)]
    pub skip_directory_objects: bool,

    /// Characters the range splitter places split points with.
    #[builder(default = String::from(DEFAULT_ALPHABET))]
    pub alphabet: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for ListerConfig {
    fn default() -> Self {
        Self {
            parallelism: 0,
            batch_size: 0,
            skip_directory_objects: false,
            alphabet: String::from(DEFAULT_ALPHABET),
            log_level: String::from("info"),
        }
    }
}

impl ListerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `FASTLIST_PARALLELISM` | `0` |
    /// | `FASTLIST_BATCH_SIZE` | `0` |
    /// | `FASTLIST_SKIP_DIRECTORY_OBJECTS` | `false` |
    /// | `FASTLIST_ALPHABET` | printable ASCII |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// Unparseable numbers and an empty alphabet keep the default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("FASTLIST_PARALLELISM") {
            if let Ok(n) = v.parse::<usize>() {
                config.parallelism = n;
            }
        }
        if let Ok(v) = std::env::var("FASTLIST_BATCH_SIZE") {
            if let Ok(n) = v.parse::<usize>() {
                config.batch_size = n;
            }
        }
        if let Ok(v) = std::env::var("FASTLIST_SKIP_DIRECTORY_OBJECTS") {
            config.skip_directory_objects = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("FASTLIST_ALPHABET") {
            if !v.is_empty() {
                config.alphabet = v;
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
pub fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
