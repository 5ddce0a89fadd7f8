use crate::PreviewError;
use scraper::{Html, Selector};
use tracing::debug;

/// Pulls the preview image declaration out of a fetched document.
#[derive(Clone, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the `og:image` declaration from an HTML document.
    ///
    /// The value is the meta element's `content` attribute verbatim, which a
    /// page may legitimately leave empty. A document without the element is
    /// [`PreviewError::NoImageFound`].
    pub fn extract_og_image(&self, html: &str) -> Result<String, PreviewError> {
        let document = Html::parse_document(html);

        let og_image_selector = Selector::parse("meta[property='og:image']")
            .map_err(|e| PreviewError::Parse(format!("invalid selector: {e}")))?;

        document
            .select(&og_image_selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|content| {
                debug!(image_url = %content, "found Open Graph image declaration");
                content.to_string()
            })
            .ok_or(PreviewError::NoImageFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_og_image_content() {
        let html = r#"<html><head>
            <meta property="og:image" content="https://example.com/cover.png"/>
        </head><body></body></html>"#;

        let image = MetadataExtractor::new().extract_og_image(html).unwrap();
        assert_eq!(image, "https://example.com/cover.png");
    }

    #[test]
    fn test_first_declaration_wins() {
        let html = r#"<html><head>
            <meta property="og:image" content="https://example.com/first.png"/>
            <meta property="og:image" content="https://example.com/second.png"/>
        </head></html>"#;

        let image = MetadataExtractor::new().extract_og_image(html).unwrap();
        assert_eq!(image, "https://example.com/first.png");
    }

    #[test]
    fn test_missing_declaration_is_no_image_found() {
        let html = "<html><head><title>plain page</title></head><body></body></html>";

        let result = MetadataExtractor::new().extract_og_image(html);
        assert!(matches!(result, Err(PreviewError::NoImageFound)));
    }
}
