use crate::{
    DocumentFetcher, FetchCoordinator, Fetcher, LinkStore, PreviewController, PreviewError,
    RenderTarget, ResolutionCache, DEFAULT_USER_AGENT, MAX_CONCURRENT_FETCHES,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Assembly root for the preview pipeline: one fetcher, one cache, one
/// coordinator, any number of attached controllers sharing them.
///
/// Construction spawns the cache warm-up as a supervised task so building the
/// service (and attaching controllers) never blocks on the store. Lookups
/// racing the warm-up miss and may fetch; the warm-up merges without
/// clobbering those fresher results.
pub struct PreviewService {
    cache: ResolutionCache,
    coordinator: Arc<FetchCoordinator>,
    warm_task: Mutex<Option<JoinHandle<Result<usize, PreviewError>>>>,
}

impl PreviewService {
    /// Service with the default fetcher configuration. Must be called from
    /// within a tokio runtime.
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self::new_with_config(store, PreviewServiceConfig::default())
    }

    pub fn new_with_config(store: Arc<dyn LinkStore>, config: PreviewServiceConfig) -> Self {
        debug!(
            user_agent = %config.user_agent,
            timeout_secs = config.timeout.as_secs(),
            "initializing preview service"
        );
        let fetcher = Arc::new(Fetcher::new_with_custom_config(
            config.timeout,
            &config.user_agent,
        ));
        Self::assemble(
            ResolutionCache::new(store),
            fetcher,
            config.max_concurrent_fetches,
        )
    }

    /// Service around a caller-supplied fetcher. The seam tests use to stub
    /// the network.
    pub fn new_with_fetcher(store: Arc<dyn LinkStore>, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self::assemble(ResolutionCache::new(store), fetcher, MAX_CONCURRENT_FETCHES)
    }

    fn assemble(
        cache: ResolutionCache,
        fetcher: Arc<dyn DocumentFetcher>,
        max_concurrent_fetches: usize,
    ) -> Self {
        let coordinator = Arc::new(FetchCoordinator::new(
            fetcher,
            cache.clone(),
            max_concurrent_fetches,
        ));

        let warm_cache = cache.clone();
        let warm_task = tokio::spawn(async move { warm_cache.load().await });

        Self {
            cache,
            coordinator,
            warm_task: Mutex::new(Some(warm_task)),
        }
    }

    /// Wait for the startup cache load. Idempotent; later calls return
    /// `Ok(0)`. Purely optional; lookups before the load completes behave as
    /// misses.
    pub async fn await_warm(&self) -> Result<usize, PreviewError> {
        let task = self.warm_task.lock().take();
        match task {
            Some(handle) => match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(PreviewError::Store(format!("cache warm-up task failed: {e}"))),
            },
            None => Ok(0),
        }
    }

    /// Controller for one render target, sharing this service's cache and
    /// coordinator. The target is held weakly; the caller keeps ownership.
    pub fn attach(&self, target: &Arc<dyn RenderTarget>) -> Arc<PreviewController> {
        Arc::new(PreviewController::new(
            self.cache.clone(),
            Arc::clone(&self.coordinator),
            Arc::downgrade(target),
        ))
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn coordinator(&self) -> &Arc<FetchCoordinator> {
        &self.coordinator
    }
}

pub struct PreviewServiceConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_concurrent_fetches: usize,
}

impl Default for PreviewServiceConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
            max_concurrent_fetches: MAX_CONCURRENT_FETCHES,
        }
    }
}

impl PreviewServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, max_concurrent_fetches: usize) -> Self {
        self.max_concurrent_fetches = max_concurrent_fetches;
        self
    }
}
