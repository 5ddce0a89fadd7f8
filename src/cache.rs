use crate::{LinkStore, PreviewError, Resolution};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Process-lifetime mapping from link fingerprint to resolution outcome.
///
/// The in-memory map is the authoritative runtime copy; the durable store is
/// read once at startup via [`load`](Self::load) and written through on every
/// [`put`](Self::put). Lookups before the load completes simply miss; callers
/// treat that as "not yet attempted", never as an error.
#[derive(Clone)]
pub struct ResolutionCache {
    entries: Arc<DashMap<u64, Resolution>>,
    store: Arc<dyn LinkStore>,
    loaded: Arc<AtomicBool>,
}

impl ResolutionCache {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            store,
            loaded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Read the durable store into memory. Called once per process lifetime,
    /// off the interaction context.
    ///
    /// Entries resolved at runtime before the load finishes win over the
    /// persisted value for the same fingerprint: the load merges, it never
    /// clobbers. Returns the number of entries taken from the store.
    pub async fn load(&self) -> Result<usize, PreviewError> {
        let persisted = self.store.load_all().await?;

        let mut merged = 0usize;
        for (key, value) in persisted {
            let Ok(fingerprint) = key.parse::<u64>() else {
                warn!(key = %key, "ignoring malformed cache key");
                continue;
            };
            self.entries.entry(fingerprint).or_insert_with(|| {
                merged += 1;
                Resolution::from_store_value(&value)
            });
        }

        self.loaded.store(true, Ordering::Release);
        info!(merged, "link cache loaded");
        Ok(merged)
    }

    /// Non-blocking read of the current in-memory state.
    pub fn lookup(&self, fingerprint: u64) -> Option<Resolution> {
        self.entries.get(&fingerprint).map(|entry| entry.clone())
    }

    /// Upsert one resolution and write it through to the durable store.
    /// Last-writer-wins per fingerprint. A store failure is logged and
    /// swallowed: the in-memory entry stays authoritative for this process.
    ///
    /// A `Failed` entry is never retried by the cache itself; overwriting one
    /// is an explicit caller decision.
    pub async fn put(&self, fingerprint: u64, resolution: Resolution) {
        self.entries.insert(fingerprint, resolution.clone());

        if let Err(e) = self
            .store
            .put(&fingerprint.to_string(), resolution.to_store_value())
            .await
        {
            e.log();
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
