use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::error::LookupError;
use crate::fetcher::PageSource;
use crate::record::{LookupRequest, NameRecord, ResultCollection};
use crate::resolver::Resolver;

/// Everything the driver needs once a batch has fully drained.
#[derive(Debug)]
pub struct BatchOutcome {
    pub collection: ResultCollection,
    pub total: usize,
    pub resolved: usize,
    pub not_found: usize,
    pub failures: usize,
}

type Completion = (String, Result<Option<NameRecord>, LookupError>);

/// Resolve every request on at most `pool_size` concurrent workers.
///
/// Workers only resolve; a single collector loop owns the [`ResultCollection`]
/// and merges completions in arrival order. Returns after every task finished.
pub async fn run_batch<S>(
    resolver: Arc<Resolver<S>>,
    requests: Vec<LookupRequest>,
    pool_size: usize,
) -> BatchOutcome
where
    S: PageSource + 'static,
{
    let pool_size = pool_size.max(1);
    let semaphore = Arc::new(Semaphore::new(pool_size));
    let total = requests.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    // Channel: workers send completions, the loop below merges them
    let (tx, mut rx) = mpsc::channel::<Completion>(pool_size * 2);

    for request in requests {
        let resolver = Arc::clone(&resolver);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let result = resolver.resolve(&request.query_name).await;
            let _ = tx.send((request.query_name, result)).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut collection = ResultCollection::new();
    let mut received = 0usize;
    let mut resolved = 0usize;
    let mut not_found = 0usize;
    let mut failures = 0usize;

    while let Some((query, result)) = rx.recv().await {
        received += 1;
        match result {
            Ok(Some(record)) => {
                debug!("Collected data for name: {}", record.name);
                if let Some(prev) = collection.get(&record.key()).filter(|p| **p != record) {
                    warn!(
                        query = %query,
                        "{} resolved differently than before (count {} vs {}); keeping latest",
                        record.name,
                        prev.count,
                        record.count
                    );
                }
                collection.insert(record);
                resolved += 1;
            }
            Ok(None) => not_found += 1,
            Err(e) => {
                warn!(query = %query, "Lookup failed for {}: {}", query, e);
                failures += 1;
            }
        }
        pb.inc(1);
    }

    // Tasks that panicked never reported
    if received < total {
        warn!("{} lookups ended without a result", total - received);
        failures += total - received;
    }

    pb.finish_and_clear();
    info!(
        "Resolved {} of {} lookups ({} unique, {} not found, {} failed)",
        resolved,
        total,
        collection.len(),
        not_found,
        failures
    );

    BatchOutcome {
        collection,
        total,
        resolved,
        not_found,
        failures,
    }
}
