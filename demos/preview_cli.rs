//! Preview links from the command line:
//!
//! ```bash
//! cargo run --example preview_cli -- "check this out https://www.rust-lang.org and tell me"
//! cargo run --example preview_cli -- https://youtu.be/dQw4w9WgXcQ
//! ```
//!
//! Resolutions persist in `link-cache.json`; run the same link twice and the
//! second pass is served without a fetch.

use link_preview::{
    setup_logging, JsonFileStore, LinkListener, LogConfig, PreviewService, RenderTarget,
};
use std::sync::Arc;
use tokio::sync::mpsc;

struct ConsoleTarget;

impl RenderTarget for ConsoleTarget {
    fn set_visible(&self, visible: bool) {
        println!("[preview] visible: {visible}");
    }

    fn set_text(&self, text: &str) {
        println!("[preview] text: {text}");
    }

    fn set_image(&self, image_url: &str) {
        println!("[preview] image: {image_url}");
    }
}

struct ChannelListener {
    done: mpsc::UnboundedSender<bool>,
}

impl LinkListener for ChannelListener {
    fn on_success(&self, image_url: &str) {
        println!("[listener] resolved: {image_url}");
        let _ = self.done.send(true);
    }

    fn on_error(&self) {
        println!("[listener] no preview image for this link");
        let _ = self.done.send(false);
    }
}

#[tokio::main]
async fn main() {
    setup_logging(LogConfig::default());

    let input = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if input.is_empty() {
        eprintln!("usage: preview_cli <text or url>");
        return;
    }

    let service = PreviewService::new(Arc::new(JsonFileStore::new("link-cache.json")));
    match service.await_warm().await {
        Ok(restored) => println!("[cache] restored {restored} entries"),
        Err(e) => eprintln!("[cache] warm-up failed: {e}"),
    }

    let target: Arc<dyn RenderTarget> = Arc::new(ConsoleTarget);
    let controller = service.attach(&target);

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    controller.set_listener(Some(Arc::new(ChannelListener { done: done_tx })));

    if !controller.parse_text_for_link(&input).await {
        println!("no previewable link in input");
        return;
    }

    // YouTube links and cache hits complete synchronously; an entry still
    // missing here means a fetch is in flight, so wait for the listener.
    let key = link_preview::fingerprint(&controller.url());
    if service.cache().lookup(key).is_none() {
        let _ = done_rx.recv().await;
    }
}
