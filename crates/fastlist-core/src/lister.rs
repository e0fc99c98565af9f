//! The fast listing facade.
//!
//! A [`Lister`] hands out a bucket listing in batches. The first batch races
//! a plain sequential listing against work-stealing listing; whichever
//! finishes first is used for every later batch. Small buckets usually favour
//! the sequential path, large ones the parallel one.
//!
//! # Examples
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use fastlist_core::{Lister, ListerInput, ObjectSource, FastListResult};
//! # async fn run(source: Arc<dyn ObjectSource>) -> FastListResult<()> {
//! let input = ListerInput::builder().bucket_name("photos").batch_size(5000).build();
//! let mut lister = Lister::new(source, input)?;
//! loop {
//!     let batch = lister.next_batch().await?;
//!     println!("{} objects", batch.objects.len());
//!     if batch.done {
//!         break;
//!     }
//! }
//! lister.close();
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use crate::config::ListerConfig;
use crate::error::{FastListResult, ListError};
use crate::sequential::sequential_listing;
use crate::source::ObjectSource;
use crate::splitter::{DEFAULT_ALPHABET, RangeSplitter};
use crate::types::{ListBatch, ListRange, ObjectAttrs, Query};
use crate::worksteal::{PendingRange, WorkstealContext, worksteal_listing};

/// Workers started per available CPU when no parallelism is given.
pub const WORKERS_PER_CPU: usize = 10;

/// How batches are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListingMethod {
    /// Race both methods on the first batch and keep the winner.
    #[default]
    Open,
    /// Page through the bucket with continuation tokens.
    Sequential,
    /// Split the namespace among workers that steal from each other.
    Worksteal,
}

impl fmt::Display for ListingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Sequential => "sequential",
            Self::Worksteal => "worksteal",
        })
    }
}

impl FromStr for ListingMethod {
    type Err = ListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "sequential" => Ok(Self::Sequential),
            "worksteal" => Ok(Self::Worksteal),
            other => Err(ListError::invalid_argument(format!("unknown listing method: {other}"))),
        }
    }
}

/// Options for a [`Lister`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct ListerInput {
    /// Bucket to list.
    #[builder(setter(into))]
    pub bucket_name: String,

    /// Number of work-stealing workers; `0` picks [`WORKERS_PER_CPU`] per CPU.
    #[builder(default)]
    pub parallelism: usize,

    /// Minimum number of objects per batch; `0` returns everything at once.
    ///
    /// Batches round up to whole pages, and skipped directory objects count
    /// toward the size.
    #[builder(default)]
    pub batch_size: usize,

    /// Filter for the listing. Use [`Projection::NoAcl`] for faster listing.
    ///
    /// [`Projection::NoAcl`]: crate::types::Projection::NoAcl
    #[builder(default)]
    pub query: Query,

    /// Drop directory placeholder objects from results.
    #[builder(default)]
    pub skip_directory_objects: bool,

    /// Alphabet for the range splitter.
    #[builder(default = String::from(DEFAULT_ALPHABET), setter(into))]
    pub alphabet: String,

    /// Listing method; [`ListingMethod::Open`] races both.
    #[builder(default)]
    pub method: ListingMethod,
}

impl ListerInput {
    /// Build input from shared configuration.
    #[must_use]
    pub fn from_config(bucket_name: impl Into<String>, query: Query, config: &ListerConfig) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            parallelism: config.parallelism,
            batch_size: config.batch_size,
            query,
            skip_directory_objects: config.skip_directory_objects,
            alphabet: config.alphabet.clone(),
            method: ListingMethod::Open,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Closed,
    Poisoned,
}

/// Lists a bucket in batches.
#[derive(Debug)]
pub struct Lister {
    source: Arc<dyn ObjectSource>,
    bucket: String,
    parallelism: usize,
    batch_size: usize,
    query: Query,
    skip_directory_objects: bool,
    splitter: Arc<RangeSplitter>,
    method: ListingMethod,
    page_token: Option<String>,
    ranges: Option<VecDeque<PendingRange>>,
    state: State,
    done: bool,
    cancel: CancellationToken,
}

impl Lister {
    /// Create a lister over `source`.
    pub fn new(source: Arc<dyn ObjectSource>, input: ListerInput) -> FastListResult<Self> {
        if input.bucket_name.is_empty() {
            return Err(ListError::invalid_argument("bucket name is required"));
        }
        let parallelism = if input.parallelism == 0 {
            default_parallelism()
        } else {
            input.parallelism
        };
        let splitter = Arc::new(RangeSplitter::new(&input.alphabet)?);

        let (start, end) = prefix_adjusted_offsets(
            &input.query.start_offset,
            &input.query.end_offset,
            &input.query.prefix,
        );
        let initial = ListRange::new(start, end);
        let mut ranges = VecDeque::with_capacity(parallelism * 2);
        if !initial.is_empty() {
            ranges.push_back(PendingRange::new(initial));
        }

        debug!(
            bucket = %input.bucket_name,
            parallelism,
            batch_size = input.batch_size,
            method = %input.method,
            "lister created"
        );

        Ok(Self {
            source,
            bucket: input.bucket_name,
            parallelism,
            batch_size: input.batch_size,
            query: input.query,
            skip_directory_objects: input.skip_directory_objects,
            splitter,
            method: input.method,
            page_token: None,
            ranges: Some(ranges),
            state: State::Open,
            done: false,
            cancel: CancellationToken::new(),
        })
    }

    /// List the next batch of objects.
    ///
    /// Once a batch comes back with `done` set, later calls return empty
    /// batches. A failed call stops every worker, returns no partial results
    /// and leaves the lister unusable; create a new lister to retry.
    pub async fn next_batch(&mut self) -> FastListResult<ListBatch> {
        match self.state {
            State::Open => {}
            State::Closed => return Err(ListError::Closed),
            State::Poisoned => return Err(ListError::Poisoned),
        }
        if self.done {
            return Ok(ListBatch {
                objects: Vec::new(),
                done: true,
            });
        }

        let objects = match self.run_batch().await {
            Ok(objects) => objects,
            Err(e) => {
                self.state = State::Poisoned;
                self.ranges = None;
                return Err(e);
            }
        };

        self.done = self.page_token.is_none() && self.ranges.as_ref().is_none_or(VecDeque::is_empty);
        info!(
            bucket = %self.bucket,
            method = %self.method,
            objects = objects.len(),
            done = self.done,
            "batch listed"
        );
        Ok(ListBatch {
            objects,
            done: self.done,
        })
    }

    /// Drain the lister, concatenating every batch.
    pub async fn list_all(&mut self) -> FastListResult<Vec<ObjectAttrs>> {
        let mut objects = Vec::new();
        loop {
            let batch = self.next_batch().await?;
            objects.extend(batch.objects);
            if batch.done {
                return Ok(objects);
            }
        }
    }

    /// Release the pending ranges. Safe to call more than once.
    pub fn close(&mut self) {
        self.ranges = None;
        self.state = State::Closed;
    }

    /// Token that aborts the in-flight and all later calls when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Method used for the next batch.
    #[must_use]
    pub fn method(&self) -> ListingMethod {
        self.method
    }

    /// Resolved number of work-stealing workers.
    #[must_use]
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Ranges not yet listed by work stealing.
    #[must_use]
    pub fn pending_ranges(&self) -> Vec<ListRange> {
        self.ranges
            .iter()
            .flatten()
            .map(|p| p.range.clone())
            .collect()
    }

    async fn run_batch(&mut self) -> FastListResult<Vec<ObjectAttrs>> {
        if self.cancel.is_cancelled() {
            return Err(ListError::Cancelled);
        }
        match self.method {
            ListingMethod::Worksteal => {
                let ctx = self.worksteal_context();
                let ranges = self.ranges.take().unwrap_or_default();
                let outcome = worksteal_listing(&ctx, ranges, self.parallelism, self.batch_size, &self.cancel)
                    .await?;
                self.ranges = Some(outcome.remaining);
                Ok(outcome.objects)
            }
            ListingMethod::Sequential => {
                let (objects, token) = self.sequential().await?;
                self.page_token = token;
                self.ranges = None;
                Ok(objects)
            }
            ListingMethod::Open => self.race().await,
        }
    }

    async fn sequential(&self) -> FastListResult<(Vec<ObjectAttrs>, Option<String>)> {
        tokio::select! {
            () = self.cancel.cancelled() => Err(ListError::Cancelled),
            listed = sequential_listing(
                self.source.as_ref(),
                &self.bucket,
                &self.query,
                self.page_token.clone(),
                self.batch_size,
                self.skip_directory_objects,
            ) => listed,
        }
    }

    /// Run both methods and keep whichever finishes first.
    async fn race(&mut self) -> FastListResult<Vec<ObjectAttrs>> {
        let ctx = self.worksteal_context();
        let ranges = self.ranges.clone().unwrap_or_default();

        let winner = {
            let worksteal = worksteal_listing(&ctx, ranges, self.parallelism, self.batch_size, &self.cancel);
            let sequential = self.sequential();
            tokio::pin!(worksteal, sequential);
            tokio::select! {
                outcome = &mut worksteal => Winner::Worksteal(outcome?),
                listed = &mut sequential => Winner::Sequential(listed?),
            }
        };

        match winner {
            Winner::Worksteal(outcome) => {
                self.method = ListingMethod::Worksteal;
                self.page_token = None;
                self.ranges = Some(outcome.remaining);
                Ok(outcome.objects)
            }
            Winner::Sequential((objects, token)) => {
                self.method = ListingMethod::Sequential;
                self.page_token = token;
                self.ranges = None;
                Ok(objects)
            }
        }
    }

    fn worksteal_context(&self) -> WorkstealContext {
        WorkstealContext {
            source: Arc::clone(&self.source),
            bucket: self.bucket.clone(),
            query: self.query.clone(),
            skip_directory_objects: self.skip_directory_objects,
            splitter: Arc::clone(&self.splitter),
        }
    }
}

enum Winner {
    Worksteal(crate::worksteal::WorkstealOutcome),
    Sequential((Vec<ObjectAttrs>, Option<String>)),
}

/// Ten workers per available CPU.
fn default_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get) * WORKERS_PER_CPU
}

/// Turn absolute offsets into offsets relative to `prefix`.
///
/// Offsets that exclude the whole prefix collapse into an empty range
/// (`start == end`); offsets that admit everything under the prefix become
/// empty bounds. An empty prefix leaves the offsets untouched.
#[must_use]
pub fn prefix_adjusted_offsets(start: &str, end: &str, prefix: &str) -> (String, String) {
    if prefix.is_empty() {
        return (start.to_owned(), end.to_owned());
    }
    if !start.is_empty() && !end.is_empty() && start >= end {
        return (start.to_owned(), start.to_owned());
    }

    let start = if start.is_empty() || start <= prefix {
        ""
    } else if let Some(rest) = start.strip_prefix(prefix) {
        rest
    } else {
        return (start.to_owned(), start.to_owned());
    };

    let end = if end.is_empty() {
        ""
    } else if let Some(rest) = end.strip_prefix(prefix).filter(|rest| !rest.is_empty()) {
        rest
    } else if end > prefix {
        ""
    } else {
        return (end.to_owned(), end.to_owned());
    };

    (start.to_owned(), end.to_owned())
}
