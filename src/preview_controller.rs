use crate::classifier::{self, ClassifiedLink};
use crate::fingerprint::fingerprint;
use crate::{
    FetchCoordinator, LinkClickListener, LinkListener, PreviewError, RenderTarget, Resolution,
    ResolutionCache, ResolutionKind, ViewerLauncher,
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Accent color (ARGB) for the embedded browser surface opened on article
/// click-through. Cyan, as the stock preview ships with.
pub const DEFAULT_ACCENT_COLOR: u32 = 0xFF00_FFFF;

#[derive(Clone, Default)]
struct CurrentLink {
    url: String,
    kind: ResolutionKind,
}

/// Drives preview requests for one render target.
///
/// Each call to [`parse_text_for_link`](Self::parse_text_for_link) or
/// [`set_link`](Self::set_link) starts a fresh request and supersedes the
/// previous one: a completion that arrives for a superseded request never
/// repaints the target (the generation check below), though its outcome still
/// lands in the shared cache. The target itself is held weakly; tearing it
/// down mid-fetch is safe and also leaves the cache populated.
pub struct PreviewController {
    cache: ResolutionCache,
    coordinator: Arc<FetchCoordinator>,
    target: Weak<dyn RenderTarget>,
    listener: RwLock<Option<Arc<dyn LinkListener>>>,
    click_listener: RwLock<Option<Arc<dyn LinkClickListener>>>,
    launcher: RwLock<Option<Arc<dyn ViewerLauncher>>>,
    accent_color: AtomicU32,
    current: RwLock<CurrentLink>,
    generation: AtomicU64,
}

impl PreviewController {
    pub fn new(
        cache: ResolutionCache,
        coordinator: Arc<FetchCoordinator>,
        target: Weak<dyn RenderTarget>,
    ) -> Self {
        Self {
            cache,
            coordinator,
            target,
            listener: RwLock::new(None),
            click_listener: RwLock::new(None),
            launcher: RwLock::new(None),
            accent_color: AtomicU32::new(DEFAULT_ACCENT_COLOR),
            current: RwLock::new(CurrentLink::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Optional load callbacks, invoked exactly once per request.
    pub fn set_listener(&self, listener: Option<Arc<dyn LinkListener>>) {
        *self.listener.write() = listener;
    }

    /// Overrides the kind-specific click behavior entirely when set.
    pub fn set_click_listener(&self, listener: Option<Arc<dyn LinkClickListener>>) {
        *self.click_listener.write() = listener;
    }

    pub fn set_launcher(&self, launcher: Option<Arc<dyn ViewerLauncher>>) {
        *self.launcher.write() = launcher;
    }

    pub fn set_accent_color(&self, color: u32) {
        self.accent_color.store(color, Ordering::Relaxed);
    }

    /// The URL of the current request, empty before the first one.
    pub fn url(&self) -> String {
        self.current.read().url.clone()
    }

    pub fn kind(&self) -> ResolutionKind {
        self.current.read().kind
    }

    /// Search free text for a previewable link and, if one is found, start a
    /// preview request for it.
    ///
    /// Returns whether classification succeeded; the eventual fetch outcome
    /// is reported through the listener, not here. Text without a link hides
    /// the target and notifies nothing.
    pub async fn parse_text_for_link(self: &Arc<Self>, text: &str) -> bool {
        match classifier::classify_text(text) {
            Some(link) => {
                debug!(url = %link.url, kind = ?link.kind, "link detected in text");
                self.begin_request(link).await;
                true
            }
            None => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                *self.current.write() = CurrentLink::default();
                self.hide();
                false
            }
        }
    }

    /// Preview a known bare URL. Fails with [`PreviewError::InvalidLink`]
    /// before mutating any state if `link` is not a syntactically valid URL;
    /// use [`parse_text_for_link`](Self::parse_text_for_link) for text with
    /// surrounding content.
    pub async fn set_link(self: &Arc<Self>, link: &str) -> Result<(), PreviewError> {
        let classified = classifier::classify_link(link)?;
        self.begin_request(classified).await;
        Ok(())
    }

    async fn begin_request(self: &Arc<Self>, link: ClassifiedLink) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.current.write() = CurrentLink {
            url: link.url.clone(),
            kind: link.kind,
        };

        match link.kind {
            ResolutionKind::None => self.hide(),
            ResolutionKind::YouTubeThumbnail => {
                let Some(image_url) = classifier::youtube_thumbnail_url(&link.url) else {
                    warn!(url = %link.url, "could not derive thumbnail from watch url");
                    self.hide();
                    return;
                };

                // Derived locally, but written through like any resolution.
                self.cache
                    .put(fingerprint(&link.url), Resolution::ImageUrl(image_url.clone()))
                    .await;
                if self.is_current(generation) {
                    self.render(&link.url, &image_url);
                }
            }
            ResolutionKind::GenericArticle => {
                let key = fingerprint(&link.url);
                match self.cache.lookup(key) {
                    Some(Resolution::ImageUrl(image_url)) => {
                        debug!(url = %link.url, "serving preview from cache");
                        self.render(&link.url, &image_url);
                    }
                    Some(Resolution::Failed) => {
                        debug!(url = %link.url, "link previously failed to resolve");
                        self.hide();
                        self.notify_error();
                    }
                    None => {
                        self.show_placeholder(&link.url);

                        let controller = Arc::clone(self);
                        let url = link.url;
                        tokio::spawn(async move {
                            let resolution = controller.coordinator.resolve(&url, key).await;
                            controller.finish_request(generation, &url, resolution);
                        });
                    }
                }
            }
        }
    }

    fn finish_request(&self, generation: u64, url: &str, resolution: Resolution) {
        let current = self.is_current(generation);
        if !current {
            debug!(url = %url, "preview request superseded, skipping render");
        }

        match resolution {
            Resolution::ImageUrl(image_url) => {
                if current {
                    self.render(url, &image_url);
                }
                self.notify_success(&image_url);
            }
            Resolution::Failed => {
                if current {
                    self.hide();
                }
                self.notify_error();
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn render(&self, url: &str, image_url: &str) {
        if let Some(target) = self.target.upgrade() {
            target.set_image(image_url);
            target.set_text(url);
            target.set_visible(true);
        }
    }

    /// Text-only state shown while a fetch is in flight.
    fn show_placeholder(&self, url: &str) {
        if let Some(target) = self.target.upgrade() {
            target.set_text(url);
            target.set_visible(true);
        }
    }

    fn hide(&self) {
        if let Some(target) = self.target.upgrade() {
            target.set_visible(false);
        }
    }

    fn notify_success(&self, image_url: &str) {
        if let Some(listener) = self.listener.read().clone() {
            listener.on_success(image_url);
        }
    }

    fn notify_error(&self) {
        if let Some(listener) = self.listener.read().clone() {
            listener.on_error();
        }
    }

    /// Click-through on the preview surface.
    ///
    /// An installed [`LinkClickListener`] overrides everything. Otherwise the
    /// action is kind-specific: articles open in the embedded browser tinted
    /// with the accent color, YouTube links go to the default external
    /// handler, and a link-less view does nothing. Launcher failures are
    /// logged and swallowed.
    pub fn click(&self) {
        let current = self.current.read().clone();

        if let Some(listener) = self.click_listener.read().clone() {
            listener.on_link_clicked(&current.url);
            return;
        }

        let Some(launcher) = self.launcher.read().clone() else {
            debug!("no viewer launcher installed, ignoring click");
            return;
        };

        let outcome = match current.kind {
            ResolutionKind::GenericArticle => {
                launcher.open_embedded(&current.url, self.accent_color.load(Ordering::Relaxed))
            }
            ResolutionKind::YouTubeThumbnail => launcher.open_external(&current.url),
            ResolutionKind::None => Ok(()),
        };

        if let Err(e) = outcome {
            e.log();
        }
    }
}
