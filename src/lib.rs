mod cache;
mod classifier;
mod error;
mod extractor;
mod fetch_coordinator;
mod fetcher;
mod fingerprint;
mod logging;
mod preview_controller;
mod preview_service;
mod store;

pub use cache::ResolutionCache;
pub use classifier::{classify_link, classify_text, youtube_thumbnail_url, ClassifiedLink};
pub use error::PreviewError;
pub use extractor::MetadataExtractor;
pub use fetch_coordinator::{FetchCoordinator, MAX_CONCURRENT_FETCHES};
pub use fetcher::{DocumentFetcher, Fetcher, DEFAULT_USER_AGENT};
pub use fingerprint::{fingerprint, normalize_url};
pub use logging::{setup_logging, LogConfig};
pub use preview_controller::{PreviewController, DEFAULT_ACCENT_COLOR};
pub use preview_service::{PreviewService, PreviewServiceConfig};
pub use store::{JsonFileStore, LinkStore, MemoryStore, FAILURE_SENTINEL};

/// How the preview image for a classified link is derived.
///
/// `None` is an explicit state, not a fallthrough: a view whose text held no
/// link stays in this state and every dispatch on it is a visible no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionKind {
    #[default]
    None,
    YouTubeThumbnail,
    GenericArticle,
}

/// Cached outcome of resolving a preview image for one link fingerprint.
///
/// Absence from the cache means "not yet attempted". Once either variant is
/// stored it is never retried automatically; a fresh `put` for the same
/// fingerprint is the only way the entry changes.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Resolution {
    ImageUrl(String),
    Failed,
}

impl Resolution {
    pub fn is_failed(&self) -> bool {
        matches!(self, Resolution::Failed)
    }

    /// Encoding used by durable stores: the image URL verbatim, or the
    /// failure sentinel.
    pub fn to_store_value(&self) -> &str {
        match self {
            Resolution::ImageUrl(image_url) => image_url,
            Resolution::Failed => FAILURE_SENTINEL,
        }
    }

    pub fn from_store_value(value: &str) -> Self {
        if value == FAILURE_SENTINEL {
            Resolution::Failed
        } else {
            Resolution::ImageUrl(value.to_string())
        }
    }
}

/// Surface the preview is painted onto. Consumed, never owned: the controller
/// keeps only a weak reference and skips painting once the surface is gone.
///
/// Implementations are responsible for their own thread affinity; the
/// controller guarantees a completed request touches the target at most once.
pub trait RenderTarget: Send + Sync {
    fn set_visible(&self, visible: bool);
    fn set_text(&self, text: &str);
    fn set_image(&self, image_url: &str);
}

/// Optional callbacks for load outcomes, invoked exactly once per request.
pub trait LinkListener: Send + Sync {
    fn on_success(&self, image_url: &str);
    fn on_error(&self);
}

/// Overrides the default click-through behavior when installed.
pub trait LinkClickListener: Send + Sync {
    fn on_link_clicked(&self, url: &str);
}

/// Opens the previewed link in an external viewer on click-through.
pub trait ViewerLauncher: Send + Sync {
    /// Open `url` in an embedded browser surface tinted with `accent_color`
    /// (ARGB). Used for article links.
    fn open_embedded(&self, url: &str, accent_color: u32) -> Result<(), PreviewError>;

    /// Hand `url` to the platform's default handler. Used for YouTube links.
    fn open_external(&self, url: &str) -> Result<(), PreviewError>;
}
