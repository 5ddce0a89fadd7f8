use twox_hash::xxh3::hash64;

/// Normalization applied before hashing: byte-identical URLs after trimming
/// map to the same fingerprint.
pub fn normalize_url(url: &str) -> &str {
    url.trim()
}

/// Cache key for a link. Cheap and stable across runs; not cryptographic, so
/// two distinct URLs can collide and share one cache entry.
pub fn fingerprint(url: &str) -> u64 {
    hash64(normalize_url(url).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_urls_equal_fingerprints() {
        assert_eq!(
            fingerprint("https://example.com/page?x=1"),
            fingerprint("https://example.com/page?x=1")
        );
    }

    #[test]
    fn test_normalization_ignores_surrounding_whitespace() {
        assert_eq!(
            fingerprint("  https://example.com \n"),
            fingerprint("https://example.com")
        );
    }

    #[test]
    fn test_distinct_urls_distinct_fingerprints() {
        assert_ne!(
            fingerprint("https://example.com/a"),
            fingerprint("https://example.com/b")
        );
    }
}
