//! Download-link extraction from search result pages.
//!
//! The [`LinkExtractor`] scans a result page body with a regex and returns
//! the matching download URLs in document order. Callers may supply their
//! own pattern (`-r/--regex`); otherwise a default pattern matching `.msu`
//! download URLs is used.

use regex::Regex;
use tracing::debug;

use crate::config::ConfigError;
use crate::search::ResultPage;

/// Default pattern: absolute URLs ending in `.msu` (Microsoft patch packages).
pub const DEFAULT_LINK_PATTERN: &str = r#"https?://[^\s"'<>]+\.msu"#;

/// Extracts download URLs from result page bodies.
///
/// Repeated occurrences of the same URL within one run are collapsed to the
/// first occurrence; order is otherwise discovery order.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    pattern: Regex,
}

impl LinkExtractor {
    /// Compiles the extractor from an optional user pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] when the supplied pattern does
    /// not compile. The default pattern always compiles.
    pub fn new(pattern: Option<&str>) -> Result<Self, ConfigError> {
        let pattern = pattern.unwrap_or(DEFAULT_LINK_PATTERN);
        let pattern = Regex::new(pattern).map_err(|_| {
            ConfigError::invalid_option(format!("invalid link pattern: {pattern}"))
        })?;
        Ok(Self { pattern })
    }

    /// Returns the download URLs found in `page`, in document order.
    #[must_use]
    pub fn extract(&self, page: &ResultPage) -> Vec<String> {
        let links: Vec<String> = self
            .pattern
            .find_iter(&page.body)
            .map(|m| m.as_str().to_string())
            .collect();
        debug!(page = %page.url, links = links.len(), "extracted links");
        links
    }

    /// Runs extraction over every page, concatenating in discovery order and
    /// dropping duplicate URLs after their first occurrence.
    #[must_use]
    pub fn extract_all(&self, pages: &[ResultPage]) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut links = Vec::new();
        for page in pages {
            for link in self.extract(page) {
                if seen.insert(link.clone()) {
                    links.push(link);
                }
            }
        }
        links
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn page(body: &str) -> ResultPage {
        ResultPage {
            url: "https://technet.example/bulletin.aspx".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_default_pattern_matches_msu_urls() {
        let extractor = LinkExtractor::new(None).unwrap();
        let links = extractor.extract(&page(
            r#"<a href="https://download.microsoft.com/d/p/Windows8.1-KB3087918-x64.msu">x64</a>
               <a href="https://download.microsoft.com/d/p/Windows8.1-KB3087918-x86.msu">x86</a>"#,
        ));
        assert_eq!(links.len(), 2);
        assert!(links[0].ends_with("x64.msu"));
        assert!(links[1].ends_with("x86.msu"));
    }

    #[test]
    fn test_default_pattern_ignores_non_msu_urls() {
        let extractor = LinkExtractor::new(None).unwrap();
        let links = extractor.extract(&page(
            r#"<a href="https://example.com/readme.html">readme</a>"#,
        ));
        assert!(links.is_empty());
    }

    #[test]
    fn test_custom_pattern() {
        let extractor = LinkExtractor::new(Some(r#"https?://[^\s"'<>]+\.exe"#)).unwrap();
        let links = extractor.extract(&page(
            r#"get <a href="https://download.microsoft.com/tool.exe">tool</a>"#,
        ));
        assert_eq!(links, vec!["https://download.microsoft.com/tool.exe"]);
    }

    #[test]
    fn test_invalid_pattern_fails() {
        let err = LinkExtractor::new(Some("[unclosed")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { .. }));
    }

    #[test]
    fn test_extract_all_preserves_discovery_order() {
        let extractor = LinkExtractor::new(None).unwrap();
        let pages = vec![
            page("https://d.example/b.msu then https://d.example/a.msu"),
            page("https://d.example/c.msu"),
        ];
        let links = extractor.extract_all(&pages);
        assert_eq!(
            links,
            vec![
                "https://d.example/b.msu",
                "https://d.example/a.msu",
                "https://d.example/c.msu"
            ]
        );
    }

    #[test]
    fn test_extract_all_drops_duplicates() {
        let extractor = LinkExtractor::new(None).unwrap();
        let pages = vec![
            page("https://d.example/a.msu"),
            page("https://d.example/a.msu and https://d.example/b.msu"),
        ];
        let links = extractor.extract_all(&pages);
        assert_eq!(
            links,
            vec!["https://d.example/a.msu", "https://d.example/b.msu"]
        );
    }

    #[test]
    fn test_extract_all_empty_pages() {
        let extractor = LinkExtractor::new(None).unwrap();
        assert!(extractor.extract_all(&[]).is_empty());
    }
}
