use crate::{PreviewError, ResolutionKind};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Token pattern for article links embedded in free text: scheme, optional
/// `www.`, host with a 2-6 letter TLD, optional path/query.
static URL_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{2,256}\.[a-z]{2,6}\b([-a-zA-Z0-9@:%_+.~#?&/=]*)$")
        .expect("url token pattern")
});

/// A link pulled out of caller input, with the canonical URL to preview and
/// how its image is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLink {
    pub url: String,
    pub kind: ResolutionKind,
}

/// Scan free text for a previewable link.
///
/// YouTube markers win over everything else: a `v=` parameter (long form) or
/// a `youtu.be/` path (short form) is canonicalized to the watch URL. Failing
/// that, the **last** whitespace-delimited token matching the URL pattern is
/// the article link. Returns `None` when the text holds nothing previewable.
pub fn classify_text(text: &str) -> Option<ClassifiedLink> {
    if text.contains("youtube") && text.contains("v=") {
        return marker_suffix(text, "v=").map(|id| ClassifiedLink {
            url: watch_url(&id),
            kind: ResolutionKind::YouTubeThumbnail,
        });
    }

    if text.contains("youtu.be") {
        return marker_suffix(text, "be/").map(|id| ClassifiedLink {
            url: watch_url(&id),
            kind: ResolutionKind::YouTubeThumbnail,
        });
    }

    if text.contains("http") {
        return text
            .split_whitespace()
            .filter(|token| URL_TOKEN.is_match(token))
            .last()
            .map(|token| ClassifiedLink {
                url: token.to_string(),
                kind: ResolutionKind::GenericArticle,
            });
    }

    None
}

/// Strict single-link entry point: `link` must already be a bare URL.
///
/// No token extraction happens here; the string itself is validated and
/// rejected with [`PreviewError::InvalidLink`] if it is not an http(s) URL.
/// YouTube links (both forms) are still canonicalized to the watch URL so the
/// thumbnail can be derived.
pub fn classify_link(link: &str) -> Result<ClassifiedLink, PreviewError> {
    let parsed = Url::parse(link).map_err(|_| PreviewError::InvalidLink(link.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(PreviewError::InvalidLink(link.to_string()));
    }

    let youtube_id = if link.contains("youtu.be") {
        marker_suffix(link, "be/")
    } else if link.contains("youtube") && link.contains("v=") {
        marker_suffix(link, "v=")
    } else {
        None
    };

    match youtube_id {
        Some(id) => Ok(ClassifiedLink {
            url: watch_url(&id),
            kind: ResolutionKind::YouTubeThumbnail,
        }),
        None => Ok(ClassifiedLink {
            url: link.to_string(),
            kind: ResolutionKind::GenericArticle,
        }),
    }
}

/// Thumbnail formula for a canonical watch URL.
pub fn youtube_thumbnail_url(watch_url: &str) -> Option<String> {
    let id = marker_suffix(watch_url, "v=")?;
    Some(format!("https://img.youtube.com/vi/{id}/hqdefault.jpg"))
}

/// The video id is whatever follows the marker up to the next whitespace.
fn marker_suffix(text: &str, marker: &str) -> Option<String> {
    let id = text.split(marker).nth(1)?.split(char::is_whitespace).next()?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}
