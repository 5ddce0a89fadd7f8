use async_trait::async_trait;
use link_preview::{
    fingerprint, DocumentFetcher, FetchCoordinator, MemoryStore, PreviewError, Resolution,
    ResolutionCache,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

const OG_PAGE: &str = r#"<html><head>
    <meta property="og:image" content="https://example.com/cover.png"/>
</head><body>article</body></html>"#;

const PLAIN_PAGE: &str = "<html><head><title>nothing here</title></head><body></body></html>";

/// Serves a fixed body, counting calls. With a closed gate the fetch blocks
/// until the test releases it, keeping the flight open while waiters attach.
struct StubFetcher {
    body: Result<String, String>,
    calls: AtomicUsize,
    gate: Semaphore,
}

impl StubFetcher {
    fn serving(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: Ok(body.to_string()),
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(Semaphore::MAX_PERMITS),
        })
    }

    fn gated(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: Ok(body.to_string()),
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            body: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(Semaphore::MAX_PERMITS),
        })
    }

    fn release(&self) {
        self.gate.add_permits(1);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentFetcher for StubFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, PreviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.acquire().await.unwrap().forget();
        match &self.body {
            Ok(body) => Ok(body.clone()),
            Err(message) => Err(PreviewError::Network(message.clone())),
        }
    }
}

fn coordinator_with(fetcher: Arc<StubFetcher>) -> (Arc<FetchCoordinator>, ResolutionCache, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let cache = ResolutionCache::new(store.clone());
    let coordinator = Arc::new(FetchCoordinator::new(fetcher, cache.clone(), 8));
    (coordinator, cache, store)
}

#[tokio::test]
async fn test_concurrent_resolves_share_one_fetch() {
    let fetcher = StubFetcher::gated(OG_PAGE);
    let (coordinator, _cache, _store) = coordinator_with(fetcher.clone());

    let url = "https://example.com/article";
    let key = fingerprint(url);

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.resolve(url, key).await })
        })
        .collect();

    // Let the leader reach the fetch and the rest attach to the flight.
    while fetcher.calls() == 0 {
        tokio::task::yield_now().await;
    }
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }

    fetcher.release();
    let results = futures::future::join_all(handles).await;

    assert_eq!(fetcher.calls(), 1);
    for result in results {
        assert_eq!(
            result.unwrap(),
            Resolution::ImageUrl("https://example.com/cover.png".to_string())
        );
    }
}

#[tokio::test]
async fn test_cached_entry_suppresses_fetch() {
    let fetcher = StubFetcher::serving(OG_PAGE);
    let (coordinator, cache, _store) = coordinator_with(fetcher.clone());

    let url = "https://example.com/article";
    let key = fingerprint(url);
    cache
        .put(key, Resolution::ImageUrl("https://example.com/warm.png".to_string()))
        .await;

    let resolution = coordinator.resolve(url, key).await;

    assert_eq!(fetcher.calls(), 0);
    assert_eq!(
        resolution,
        Resolution::ImageUrl("https://example.com/warm.png".to_string())
    );
}

#[tokio::test]
async fn test_cold_then_warm_resolution_is_idempotent() {
    let fetcher = StubFetcher::serving(OG_PAGE);
    let (coordinator, _cache, _store) = coordinator_with(fetcher.clone());

    let url = "https://example.com/article";
    let key = fingerprint(url);

    let cold = coordinator.resolve(url, key).await;
    let warm = coordinator.resolve(url, key).await;

    assert_eq!(cold, warm);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_page_without_og_image_caches_failure() {
    let fetcher = StubFetcher::serving(PLAIN_PAGE);
    let (coordinator, cache, store) = coordinator_with(fetcher.clone());

    let url = "https://example.com/plain";
    let key = fingerprint(url);

    let resolution = coordinator.resolve(url, key).await;

    assert_eq!(resolution, Resolution::Failed);
    assert_eq!(cache.lookup(key), Some(Resolution::Failed));
    assert_eq!(
        store.snapshot().get(&key.to_string()).map(String::as_str),
        Some("Fail")
    );
}

#[tokio::test]
async fn test_network_failure_caches_failure_and_sticks() {
    let fetcher = StubFetcher::failing("connection refused");
    let (coordinator, cache, _store) = coordinator_with(fetcher.clone());

    let url = "https://unreachable.example.com/";
    let key = fingerprint(url);

    assert_eq!(coordinator.resolve(url, key).await, Resolution::Failed);
    assert_eq!(cache.lookup(key), Some(Resolution::Failed));

    // Failed entries are sticky: no retry on a second resolve.
    assert_eq!(coordinator.resolve(url, key).await, Resolution::Failed);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_fetch_image_distinguishes_failure_modes() {
    let fetcher = StubFetcher::serving(PLAIN_PAGE);
    let (coordinator, _cache, _store) = coordinator_with(fetcher);
    let result = coordinator.fetch_image("https://example.com/plain").await;
    assert!(matches!(result, Err(PreviewError::NoImageFound)));

    let fetcher = StubFetcher::failing("connection refused");
    let (coordinator, _cache, _store) = coordinator_with(fetcher);
    let result = coordinator.fetch_image("https://unreachable.example.com/").await;
    assert!(matches!(result, Err(PreviewError::Network(_))));
}

#[tokio::test]
async fn test_empty_og_image_content_is_a_success() {
    let page = r#"<html><head><meta property="og:image" content=""/></head></html>"#;
    let fetcher = StubFetcher::serving(page);
    let (coordinator, cache, _store) = coordinator_with(fetcher);

    let url = "https://example.com/empty";
    let key = fingerprint(url);

    // The declaration's value is taken verbatim, even when empty.
    assert_eq!(
        coordinator.resolve(url, key).await,
        Resolution::ImageUrl(String::new())
    );
    assert_eq!(cache.lookup(key), Some(Resolution::ImageUrl(String::new())));
}
