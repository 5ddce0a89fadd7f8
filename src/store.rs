use crate::PreviewError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// Store value marking a link whose resolution failed. Everything else is an
/// image URL.
pub const FAILURE_SENTINEL: &str = "Fail";

/// Durable key/value backend for resolved links. Keys are string-encoded
/// fingerprints, values are image URLs or [`FAILURE_SENTINEL`].
///
/// The cache reads the store wholesale once at startup and writes through one
/// entry at a time afterward; nothing else is required of an implementation.
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn load_all(&self) -> Result<HashMap<String, String>, PreviewError>;

    async fn put(&self, key: &str, value: &str) -> Result<(), PreviewError>;
}

/// Non-durable store. Previews resolved in this process are deduplicated but
/// nothing survives a restart. Also the standard test double.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents, for inspection.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn load_all(&self) -> Result<HashMap<String, String>, PreviewError> {
        Ok(self.snapshot())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), PreviewError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed store: one JSON object, read wholesale at load and rewritten on
/// every put. Suited to the few hundred entries a chat view accumulates.
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes writers; the file on disk always reflects the last completed put.
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl LinkStore for JsonFileStore {
    async fn load_all(&self) -> Result<HashMap<String, String>, PreviewError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no persisted link cache yet");
                return Ok(HashMap::new());
            }
            Err(e) => return Err(PreviewError::Store(e.to_string())),
        };

        let persisted: HashMap<String, String> =
            serde_json::from_slice(&bytes).map_err(|e| PreviewError::Store(e.to_string()))?;

        debug!(path = %self.path.display(), entries = persisted.len(), "read persisted link cache");
        *self.entries.lock().await = persisted.clone();
        Ok(persisted)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), PreviewError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value.to_string());

        let serialized =
            serde_json::to_vec_pretty(&*entries).map_err(|e| PreviewError::Store(e.to_string()))?;
        tokio::fs::write(&self.path, serialized)
            .await
            .map_err(|e| PreviewError::Store(e.to_string()))
    }
}
