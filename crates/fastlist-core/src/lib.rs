//! Parallel listing of lexicographically ordered object buckets.
//!
//! A single paginated listing is bounded by round-trip latency. This crate
//! splits the flat key namespace of a bucket into ranges, lists them with a
//! pool of concurrent workers, and rebalances through work stealing whenever
//! a worker runs dry.
//!
//! # Architecture
//!
//! ```text
//!        Lister (batches, method race)
//!         |                    |
//!         v                    v
//!   sequential_listing   worksteal_listing ── RangeSplitter
//!         |                    |
//!         |                 next_page (cursor hold-back)
//!         v                    v
//!           ObjectSource (paginated collaborator)
//! ```

pub mod config;
pub mod error;
pub mod lister;
pub mod page;
pub mod sequential;
pub mod source;
pub mod splitter;
pub mod types;
pub mod worksteal;

pub use config::ListerConfig;
pub use error::{FastListResult, ListError, SourceError};
pub use lister::{Lister, ListerInput, ListingMethod};
pub use source::{ListRequest, ObjectPage, ObjectSource};
pub use splitter::RangeSplitter;
pub use types::{ListBatch, ListRange, NextPageResult, ObjectAttrs, Projection, Query};
