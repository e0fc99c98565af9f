//! Work-stealing listing.
//!
//! A listing call runs a pool of workers, each owning one range at a time,
//! and a coordinator on the calling task. Workers read pages through
//! [`next_page`] and report their remaining range after every page. When a
//! worker runs out of work the coordinator asks the busiest active worker to
//! yield: that worker splits its own unread remainder once, keeps the head
//! and hands the tail back, so a range is only ever mutated by its owner.
//!
//! ```text
//!   coordinator ──Assign / Yield / Stop──▶ worker
//!   coordinator ◀─Progress / Yielded / Idle / Parked── worker
//! ```

use std::cmp::Reverse;
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{FastListResult, ListError};
use crate::page::{NextPageOpts, next_page};
use crate::source::ObjectSource;
use crate::splitter::RangeSplitter;
use crate::types::{ListRange, ObjectAttrs, Query};

/// A range waiting to be listed, with the generation bound of its start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingRange {
    /// Prefix-relative range.
    pub range: ListRange,
    /// Versions of `range.start` below this generation are already listed.
    pub generation: i64,
}

impl PendingRange {
    /// A fresh range with no generation bound.
    #[must_use]
    pub fn new(range: ListRange) -> Self {
        Self { range, generation: 0 }
    }
}

/// Objects accumulated by all workers of one listing call.
#[derive(Debug, Default)]
pub struct ListerResult {
    objects: Mutex<Vec<ObjectAttrs>>,
}

impl ListerResult {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page of objects, returning the new total.
    pub fn append(&self, items: Vec<ObjectAttrs>) -> usize {
        let mut objects = self.objects.lock();
        objects.extend(items);
        objects.len()
    }

    /// Number of objects accumulated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    /// Whether nothing has been accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }

    /// Take the accumulated objects, leaving the accumulator empty.
    pub fn take(&self) -> Vec<ObjectAttrs> {
        std::mem::take(&mut *self.objects.lock())
    }
}

/// Everything a worker needs to list a range.
#[derive(Debug, Clone)]
pub struct WorkstealContext {
    /// Listing collaborator.
    pub source: Arc<dyn ObjectSource>,
    /// Bucket to list.
    pub bucket: String,
    /// Base query; prefix, delimiter, versions and selection apply to every page.
    pub query: Query,
    /// Drop directory placeholder objects.
    pub skip_directory_objects: bool,
    /// Shared splitter.
    pub splitter: Arc<RangeSplitter>,
}

/// Result of one work-stealing call.
#[derive(Debug, Default)]
pub struct WorkstealOutcome {
    /// Objects listed by this call.
    pub objects: Vec<ObjectAttrs>,
    /// Ranges left unlisted because the batch size was reached.
    pub remaining: VecDeque<PendingRange>,
}

#[derive(Debug)]
enum Command {
    Assign(PendingRange),
    Yield,
    Stop,
}

#[derive(Debug)]
enum Event {
    Progress { id: usize, remaining: ListRange },
    Yielded { id: usize, tail: Option<PendingRange> },
    Idle { id: usize },
    Parked { id: usize, remaining: PendingRange },
}

/// List `ranges` with `parallelism` workers.
///
/// Returns once every range is exhausted or, when `batch_size > 0`, once at
/// least `batch_size` objects were listed; in the latter case the unread
/// parts of all ranges come back in [`WorkstealOutcome::remaining`]. The
/// first worker error cancels the remaining workers and fails the call.
pub async fn worksteal_listing(
    ctx: &WorkstealContext,
    ranges: VecDeque<PendingRange>,
    parallelism: usize,
    batch_size: usize,
    cancel: &CancellationToken,
) -> FastListResult<WorkstealOutcome> {
    let parallelism = parallelism.max(1);
    let pending = initial_partition(&ctx.splitter, ranges, parallelism)?;
    let result = Arc::new(ListerResult::new());
    let pool_cancel = cancel.child_token();

    let (event_tx, mut events) = mpsc::unbounded_channel();
    let mut workers = JoinSet::new();
    let mut slots = Vec::with_capacity(parallelism);
    for id in 0..parallelism {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let worker = Worker {
            id,
            ctx: ctx.clone(),
            result: Arc::clone(&result),
            commands,
            events: event_tx.clone(),
            cancel: pool_cancel.clone(),
        };
        workers.spawn(worker.run());
        slots.push(WorkerSlot::new(command_tx));
    }
    drop(event_tx);

    let mut coordinator = Coordinator {
        slots,
        pending,
        outstanding_yields: 0,
        stopping: false,
    };

    loop {
        if !coordinator.stopping {
            let batch_full = batch_size > 0 && result.len() >= batch_size;
            if batch_full || coordinator.all_done() {
                coordinator.stop_all();
            } else {
                coordinator.dispatch();
            }
        }

        tokio::select! {
            () = cancel.cancelled() => {
                pool_cancel.cancel();
                workers.abort_all();
                return Err(ListError::Cancelled);
            }
            Some(joined) = workers.join_next() => {
                if let Err(e) = flatten(joined) {
                    warn!(bucket = %ctx.bucket, error = %e, "worker failed, cancelling pool");
                    pool_cancel.cancel();
                    workers.abort_all();
                    return Err(e);
                }
            }
            event = events.recv() => match event {
                Some(event) => coordinator.handle(event),
                None => break,
            }
        }
    }

    while let Some(joined) = workers.join_next().await {
        flatten(joined)?;
    }

    let objects = result.take();
    debug!(
        bucket = %ctx.bucket,
        objects = objects.len(),
        remaining = coordinator.pending.len(),
        "worksteal listing completed"
    );
    Ok(WorkstealOutcome {
        objects,
        remaining: coordinator.pending,
    })
}

fn flatten(joined: Result<FastListResult<()>, tokio::task::JoinError>) -> FastListResult<()> {
    joined?
}

/// Spread a lone range over the pool up front.
///
/// Several ranges, or a range that cannot be split, are left as they are
/// and rebalanced by stealing.
fn initial_partition(
    splitter: &RangeSplitter,
    mut ranges: VecDeque<PendingRange>,
    parallelism: usize,
) -> FastListResult<VecDeque<PendingRange>> {
    ranges.retain(|r| !r.range.is_empty());
    if ranges.len() != 1 || parallelism < 2 {
        return Ok(ranges);
    }
    let Some(first) = ranges.pop_front() else {
        return Ok(ranges);
    };

    let points = splitter.split_range(&first.range.start, &first.range.end, parallelism - 1)?;
    if points.is_empty() {
        ranges.push_back(first);
        return Ok(ranges);
    }

    let mut bounds = Vec::with_capacity(points.len() + 2);
    bounds.push(first.range.start.clone());
    bounds.extend(points);
    bounds.push(first.range.end.clone());

    let mut generation = first.generation;
    for pair in bounds.windows(2) {
        ranges.push_back(PendingRange {
            range: ListRange::new(pair[0].clone(), pair[1].clone()),
            generation,
        });
        generation = 0;
    }
    Ok(ranges)
}

/// Split the unread remainder of `current` once, keeping the head.
fn yield_tail(splitter: &RangeSplitter, current: &mut PendingRange) -> FastListResult<Option<PendingRange>> {
    let points = splitter.split_range(&current.range.start, &current.range.end, 1)?;
    let Some(point) = points.into_iter().next() else {
        return Ok(None);
    };
    let end = std::mem::replace(&mut current.range.end, point.clone());
    Ok(Some(PendingRange::new(ListRange::new(point, end))))
}

/// Ranking of a range's remaining span; larger sorts first.
///
/// Ranges sharing a longer common prefix are narrower. Past the common
/// prefix, four code points of each bound are compared numerically, with an
/// unbounded end counting as the maximum.
fn span_rank(range: &ListRange) -> (Reverse<usize>, u128) {
    const DIGITS: usize = 4;
    const RADIX: u128 = 0x11_0001;

    if range.end.is_empty() {
        let start = digits_value(range.start.chars(), DIGITS, RADIX);
        return (Reverse(0), RADIX.pow(4) - start);
    }
    let common = range
        .start
        .chars()
        .zip(range.end.chars())
        .take_while(|(a, b)| a == b)
        .count();
    let start = digits_value(range.start.chars().skip(common), DIGITS, RADIX);
    let end = digits_value(range.end.chars().skip(common), DIGITS, RADIX);
    (Reverse(common), end.saturating_sub(start))
}

fn digits_value(chars: impl Iterator<Item = char>, digits: usize, radix: u128) -> u128 {
    let mut chars = chars.take(digits);
    (0..digits).fold(0, |acc, _| {
        acc * radix + chars.next().map_or(0, |c| u128::from(u32::from(c)) + 1)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerStatus {
    Idle,
    Active,
    Stopped,
}

#[derive(Debug)]
struct WorkerSlot {
    commands: mpsc::UnboundedSender<Command>,
    status: WorkerStatus,
    remaining: ListRange,
    yield_requested: bool,
    unsplittable: bool,
}

impl WorkerSlot {
    fn new(commands: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            commands,
            status: WorkerStatus::Idle,
            remaining: ListRange::default(),
            yield_requested: false,
            unsplittable: false,
        }
    }

    fn send(&self, command: Command) {
        // A closed channel means the worker already exited; its result is
        // collected from the join set.
        let _ = self.commands.send(command);
    }
}

#[derive(Debug)]
struct Coordinator {
    slots: Vec<WorkerSlot>,
    pending: VecDeque<PendingRange>,
    outstanding_yields: usize,
    stopping: bool,
}

impl Coordinator {
    fn all_done(&self) -> bool {
        self.pending.is_empty()
            && self.outstanding_yields == 0
            && self.slots.iter().all(|s| s.status != WorkerStatus::Active)
    }

    fn stop_all(&mut self) {
        self.stopping = true;
        for slot in &self.slots {
            slot.send(Command::Stop);
        }
    }

    fn dispatch(&mut self) {
        for slot in &mut self.slots {
            if slot.status != WorkerStatus::Idle {
                continue;
            }
            let Some(next) = self.pending.pop_front() else {
                break;
            };
            slot.status = WorkerStatus::Active;
            slot.remaining = next.range.clone();
            slot.unsplittable = false;
            slot.send(Command::Assign(next));
        }

        let idle = self
            .slots
            .iter()
            .filter(|s| s.status == WorkerStatus::Idle)
            .count();
        while idle > self.outstanding_yields {
            let donor = self
                .slots
                .iter()
                .enumerate()
                .filter(|(_, s)| s.status == WorkerStatus::Active && !s.yield_requested && !s.unsplittable)
                .max_by_key(|(id, s)| (span_rank(&s.remaining), Reverse(*id)))
                .map(|(id, _)| id);
            let Some(id) = donor else {
                break;
            };
            debug!(worker = id, start = %self.slots[id].remaining.start, end = %self.slots[id].remaining.end, "requesting yield");
            self.slots[id].yield_requested = true;
            self.slots[id].send(Command::Yield);
            self.outstanding_yields += 1;
        }
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Progress { id, remaining } => {
                let slot = &mut self.slots[id];
                if slot.remaining != remaining {
                    slot.unsplittable = false;
                }
                slot.remaining = remaining;
            }
            Event::Yielded { id, tail } => {
                self.outstanding_yields = self.outstanding_yields.saturating_sub(1);
                let slot = &mut self.slots[id];
                slot.yield_requested = false;
                match tail {
                    Some(tail) => {
                        debug!(worker = id, start = %tail.range.start, end = %tail.range.end, "range stolen");
                        slot.remaining.end.clone_from(&tail.range.start);
                        self.pending.push_back(tail);
                    }
                    None => slot.unsplittable = true,
                }
            }
            Event::Idle { id } => {
                let slot = &mut self.slots[id];
                slot.status = WorkerStatus::Idle;
                slot.remaining = ListRange::default();
            }
            Event::Parked { id, remaining } => {
                self.slots[id].status = WorkerStatus::Stopped;
                self.pending.push_back(remaining);
            }
        }
    }
}

#[derive(Debug)]
struct Worker {
    id: usize,
    ctx: WorkstealContext,
    result: Arc<ListerResult>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(mut self) -> FastListResult<()> {
        loop {
            let Some(mut current) = self.wait_for_work().await? else {
                return Ok(());
            };

            loop {
                let opts = NextPageOpts {
                    bucket: self.ctx.bucket.clone(),
                    query: self.ctx.query.clone(),
                    start_range: current.range.start.clone(),
                    end_range: current.range.end.clone(),
                    skip_directory_objects: self.ctx.skip_directory_objects,
                    generation: current.generation,
                };
                let page = tokio::select! {
                    () = self.cancel.cancelled() => return Err(ListError::Cancelled),
                    page = next_page(self.ctx.source.as_ref(), opts) => page?,
                };
                self.result.append(page.items);

                if page.done_listing {
                    self.report(Event::Idle { id: self.id })?;
                    break;
                }
                current.range.start = page.next_start_range;
                current.generation = page.generation;

                if self.drain_commands(&mut current)? {
                    self.report(Event::Parked {
                        id: self.id,
                        remaining: current,
                    })?;
                    return Ok(());
                }
                self.report(Event::Progress {
                    id: self.id,
                    remaining: current.range.clone(),
                })?;
            }
        }
    }

    /// Wait for an assignment; `None` when told to stop.
    async fn wait_for_work(&mut self) -> FastListResult<Option<PendingRange>> {
        loop {
            let command = tokio::select! {
                () = self.cancel.cancelled() => return Err(ListError::Cancelled),
                command = self.commands.recv() => command,
            };
            match command {
                Some(Command::Assign(range)) => return Ok(Some(range)),
                Some(Command::Yield) => self.report(Event::Yielded { id: self.id, tail: None })?,
                Some(Command::Stop) | None => return Ok(None),
            }
        }
    }

    /// Answer queued commands between pages; `true` when told to stop.
    fn drain_commands(&mut self, current: &mut PendingRange) -> FastListResult<bool> {
        let mut stop = false;
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Yield => {
                    let tail = yield_tail(&self.ctx.splitter, current)?;
                    self.report(Event::Yielded { id: self.id, tail })?;
                }
                Command::Stop => stop = true,
                Command::Assign(range) => {
                    return Err(ListError::Internal(anyhow::anyhow!(
                        "worker {} assigned {range:?} while busy",
                        self.id
                    )));
                }
            }
        }
        Ok(stop)
    }

    fn report(&self, event: Event) -> FastListResult<()> {
        self.events.send(event).map_err(|_| ListError::Cancelled)
    }
}
