use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("not a valid link: {0}")]
    InvalidLink(String),

    #[error("failed to fetch document: {0}")]
    Network(String),

    #[error("failed to parse document: {0}")]
    Parse(String),

    #[error("document declares no preview image")]
    NoImageFound,

    #[error("cache store error: {0}")]
    Store(String),

    #[error("failed to dispatch click action: {0}")]
    ClickDispatch(String),
}

impl PreviewError {
    pub fn log(&self) {
        match self {
            PreviewError::InvalidLink(link) => {
                warn!(link = %link, "input is not a valid link");
            }
            PreviewError::Network(e) => {
                error!(error = %e, "document fetch failed");
            }
            PreviewError::Parse(e) => {
                error!(error = %e, "document parse failed");
            }
            PreviewError::NoImageFound => {
                warn!("document declares no preview image");
            }
            PreviewError::Store(e) => {
                warn!(error = %e, "cache store operation failed");
            }
            PreviewError::ClickDispatch(e) => {
                error!(error = %e, "click dispatch failed");
            }
        }
    }
}
