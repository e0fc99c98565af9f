//! fastlist bench - lists a synthetic in-memory bucket.
//!
//! Populates a [`MemoryStore`] bucket with randomly named objects, lists it
//! through the [`Lister`] facade and reports how many objects each batch
//! returned, which method won the first-batch race and how long it took.
//!
//! # Usage
//!
//! ```text
//! BENCH_OBJECTS=200000 BENCH_LATENCY_MS=20 FASTLIST_PARALLELISM=16 fastlist-bench
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BENCH_OBJECTS` | `50000` | Number of object names to create |
//! | `BENCH_VERSIONS` | `1` | Versions per object; more than one makes the bucket versioned |
//! | `BENCH_PREFIX` | *(empty)* | Prefix for generated names and the listing |
//! | `BENCH_LATENCY_MS` | `5` | Simulated latency per listing page |
//! | `BENCH_METHOD` | `open` | `open`, `sequential` or `worksteal` |
//! | `FASTLIST_PARALLELISM` | `0` | Workers; `0` picks ten per CPU |
//! | `FASTLIST_BATCH_SIZE` | `0` | Objects per batch; `0` lists everything at once |
//! | `FASTLIST_SKIP_DIRECTORY_OBJECTS` | `false` | Drop directory placeholder objects |
//! | `FASTLIST_ALPHABET` | printable ASCII | Range splitter alphabet |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use fastlist_core::{Lister, ListerConfig, ListerInput, ListingMethod, Query};
use fastlist_memstore::{MemoryStore, StoreOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Bucket populated by the bench.
const BUCKET: &str = "fastlist-bench";

/// Bench-only settings.
#[derive(Debug, Clone)]
struct BenchConfig {
    objects: usize,
    versions: usize,
    prefix: String,
    latency: Duration,
    method: ListingMethod,
}

impl BenchConfig {
    /// Load bench settings from environment variables.
    fn from_env() -> Result<Self> {
        Ok(Self {
            objects: env_or("BENCH_OBJECTS", 50_000)?,
            versions: env_or::<usize>("BENCH_VERSIONS", 1)?.max(1),
            prefix: std::env::var("BENCH_PREFIX").unwrap_or_default(),
            latency: Duration::from_millis(env_or("BENCH_LATENCY_MS", 5)?),
            method: std::env::var("BENCH_METHOD")
                .ok()
                .map(|v| v.parse::<ListingMethod>())
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(v) => v.parse().with_context(|| format!("invalid value for {name}: {v}")),
        Err(_) => Ok(default),
    }
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Create the bucket and fill it with randomly named objects.
fn populate(store: &MemoryStore, bench: &BenchConfig) -> Result<usize> {
    store.create_bucket(BUCKET, bench.versions > 1)?;
    for _ in 0..bench.objects {
        let name = format!("{}{}", bench.prefix, Uuid::new_v4().simple());
        for version in 0..bench.versions {
            store.put_object(BUCKET, &name, version.to_string().as_bytes())?;
        }
    }
    Ok(bench.objects * bench.versions)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ListerConfig::from_env();
    init_tracing(&config.log_level)?;
    let bench = BenchConfig::from_env()?;

    let store = Arc::new(MemoryStore::new());
    let started = Instant::now();
    let expected = populate(&store, &bench)?;
    info!(
        objects = bench.objects,
        versions = bench.versions,
        elapsed_ms = started.elapsed().as_millis(),
        "bucket populated"
    );
    store.set_options(StoreOptions::builder().latency(bench.latency).build());

    let query = Query::builder()
        .prefix(bench.prefix.clone())
        .versions(bench.versions > 1)
        .build();
    let mut input = ListerInput::from_config(BUCKET, query, &config);
    input.method = bench.method;
    let mut lister = Lister::new(Arc::clone(&store) as Arc<dyn fastlist_core::ObjectSource>, input)?;
    info!(
        parallelism = lister.parallelism(),
        batch_size = config.batch_size,
        method = %bench.method,
        "listing started"
    );

    let started = Instant::now();
    let mut listed = 0;
    let mut batches = 0;
    loop {
        let batch = lister.next_batch().await.context("listing batch")?;
        batches += 1;
        listed += batch.objects.len();
        if batch.done {
            break;
        }
    }
    lister.close();

    let elapsed = started.elapsed();
    info!(
        listed,
        batches,
        method = %lister.method(),
        list_calls = store.list_calls(),
        elapsed_ms = elapsed.as_millis(),
        "listing completed"
    );

    if listed != expected {
        bail!("listed {listed} objects, expected {expected}");
    }
    Ok(())
}
