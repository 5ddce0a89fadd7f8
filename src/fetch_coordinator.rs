use crate::{DocumentFetcher, MetadataExtractor, PreviewError, Resolution, ResolutionCache};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, warn};

/// Upper bound on concurrent outbound fetches across all fingerprints.
pub const MAX_CONCURRENT_FETCHES: usize = 500;

/// Resolves preview images for article links, at most one outbound fetch per
/// fingerprint.
///
/// The first caller for a fingerprint becomes the leader: it fetches, parses,
/// writes the outcome into the cache and then completes every waiter. Callers
/// arriving while the fetch is in flight subscribe to the same flight instead
/// of issuing a second request.
pub struct FetchCoordinator {
    fetcher: Arc<dyn DocumentFetcher>,
    extractor: MetadataExtractor,
    cache: ResolutionCache,
    in_flight: DashMap<u64, broadcast::Sender<Resolution>>,
    limiter: Semaphore,
}

enum Flight {
    Leader(broadcast::Sender<Resolution>),
    Waiter(broadcast::Receiver<Resolution>),
}

impl FetchCoordinator {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        cache: ResolutionCache,
        max_concurrent_fetches: usize,
    ) -> Self {
        Self {
            fetcher,
            extractor: MetadataExtractor::new(),
            cache,
            in_flight: DashMap::new(),
            limiter: Semaphore::new(max_concurrent_fetches),
        }
    }

    /// Resolve `url` under `fingerprint`, collapsing every failure to
    /// [`Resolution::Failed`]. The cache is updated before any waiter is
    /// completed, so a caller observing the in-flight table empty will find
    /// the entry in the cache.
    pub async fn resolve(&self, url: &str, fingerprint: u64) -> Resolution {
        // Resolve-once: an existing entry, including Failed, suppresses the fetch.
        if let Some(existing) = self.cache.lookup(fingerprint) {
            debug!(url = %url, fingerprint, "resolution already cached, skipping fetch");
            return existing;
        }

        let flight = match self.in_flight.entry(fingerprint) {
            Entry::Occupied(entry) => Flight::Waiter(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                let (tx, _) = broadcast::channel(1);
                entry.insert(tx.clone());
                Flight::Leader(tx)
            }
        };

        match flight {
            Flight::Waiter(mut rx) => {
                debug!(url = %url, fingerprint, "attaching to in-flight fetch");
                match rx.recv().await {
                    Ok(resolution) => resolution,
                    // Leader dropped without completing; fall back to whatever
                    // it managed to cache.
                    Err(_) => self.cache.lookup(fingerprint).unwrap_or(Resolution::Failed),
                }
            }
            Flight::Leader(tx) => {
                let outcome = match self.limiter.acquire().await {
                    Ok(_permit) => self.fetch_image(url).await,
                    Err(_) => {
                        warn!(url = %url, "fetch limiter closed");
                        Err(PreviewError::Network("fetch limiter closed".to_string()))
                    }
                };

                let resolution = match outcome {
                    Ok(image_url) => {
                        debug!(url = %url, image_url = %image_url, "resolved preview image");
                        Resolution::ImageUrl(image_url)
                    }
                    Err(e) => {
                        e.log();
                        Resolution::Failed
                    }
                };

                self.cache.put(fingerprint, resolution.clone()).await;
                self.in_flight.remove(&fingerprint);
                let _ = tx.send(resolution.clone());
                resolution
            }
        }
    }

    /// One fetch-and-parse pass with the full error taxonomy, for callers that
    /// want to distinguish network, parse and missing-image failures.
    /// [`resolve`](Self::resolve) collapses all three to `Failed`.
    pub async fn fetch_image(&self, url: &str) -> Result<String, PreviewError> {
        let html = self.fetcher.fetch(url).await?;
        self.extractor.extract_og_image(&html)
    }
}
