//! Allow/deny policy for the crawl frontier.

use azui_kb_shared::CrawlConfig;

/// Decides which URLs may enter and leave the frontier.
///
/// A URL is allowed iff it starts with an allow-prefix and contains no
/// exclude-pattern. PDF links may be queued without passing that test when
/// `include_pdf_links` is set, but only allowed URLs are ever fetched.
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    allow_prefixes: Vec<String>,
    exclude_patterns: Vec<String>,
    include_pdf_links: bool,
}

impl UrlPolicy {
    pub fn new(
        allow_prefixes: Vec<String>,
        exclude_patterns: Vec<String>,
        include_pdf_links: bool,
    ) -> Self {
        // An empty prefix would allow everything, an empty pattern would exclude everything.
        let non_empty = |v: Vec<String>| v.into_iter().filter(|s| !s.is_empty()).collect();
        Self {
            allow_prefixes: non_empty(allow_prefixes),
            exclude_patterns: non_empty(exclude_patterns),
            include_pdf_links,
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(
            config.allow_prefixes.clone(),
            config.exclude_patterns.clone(),
            config.include_pdf_links,
        )
    }

    /// Starts with an allow-prefix and contains no exclude-pattern.
    pub fn is_allowed(&self, url: &str) -> bool {
        if !self.allow_prefixes.iter().any(|p| url.starts_with(p.as_str())) {
            return false;
        }
        !self.exclude_patterns.iter().any(|p| url.contains(p.as_str()))
    }

    /// PDF link admitted through the `include_pdf_links` exception.
    pub fn is_pdf_exempt(&self, url: &str) -> bool {
        self.include_pdf_links && looks_like_pdf(url)
    }

    /// Whether the crawler may queue `url`. Dequeue uses [`Self::is_allowed`].
    pub fn should_enqueue(&self, url: &str) -> bool {
        self.is_allowed(url) || self.is_pdf_exempt(url)
    }
}

/// Case-insensitive `.pdf` suffix on the URL, ignoring query and fragment.
pub fn looks_like_pdf(url: &str) -> bool {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query.to_ascii_lowercase().ends_with(".pdf")
}
