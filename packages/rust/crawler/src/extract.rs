//! HTML content extraction: title, visible text, and labelled anchors.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use azui_kb_shared::UNTITLED;

/// Cap on stored visible text, in characters.
pub const MAX_TEXT_CHARS: usize = 50_000;

/// Elements whose text is never visible.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href], area[href]").expect("valid selector"));

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// An outbound link with the visible text of its anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Absolute, fragment-stripped URL.
    pub url: String,
    /// Whitespace-collapsed anchor text (may be empty).
    pub label: String,
}

/// Everything the crawler keeps from an HTML page.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub title: String,
    pub text: String,
    pub anchors: Vec<Anchor>,
}

/// Parse `html` and extract title, capped visible text, and anchors resolved against `base`.
pub fn extract(html: &str, base: &Url) -> ExtractedPage {
    let doc = Html::parse_document(html);
    ExtractedPage {
        title: extract_title(&doc),
        text: truncate_chars(&extract_text(&doc), MAX_TEXT_CHARS),
        anchors: extract_anchors(&doc, base),
    }
}

/// Whitespace-collapsed `<title>`, or `"Untitled"`.
pub fn extract_title(doc: &Html) -> String {
    doc.select(&TITLE_SEL)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// All text nodes outside hidden elements, joined and whitespace-collapsed.
pub fn extract_text(doc: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }

    collapse_whitespace(&parts.join(" "))
}

/// Every `<a href>` / `<area href>` resolved to an absolute http(s) URL, in document order.
pub fn extract_anchors(doc: &Html, base: &Url) -> Vec<Anchor> {
    let mut anchors = Vec::new();

    for el in doc.select(&ANCHOR_SEL) {
        let Some(href) = el.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let lowered = href.to_ascii_lowercase();
        if lowered.starts_with("javascript:")
            || lowered.starts_with("mailto:")
            || lowered.starts_with("tel:")
        {
            continue;
        }

        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        resolved.set_fragment(None);

        anchors.push(Anchor {
            url: resolved.to_string(),
            label: collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")),
        });
    }

    anchors
}

/// Anchor URLs, deduplicated, first appearance wins.
pub fn unique_links(anchors: &[Anchor]) -> Vec<String> {
    let mut seen = HashSet::new();
    anchors
        .iter()
        .filter(|a| seen.insert(a.url.as_str()))
        .map(|a| a.url.clone())
        .collect()
}

/// Whether a `Content-Type` header value denotes HTML.
pub fn is_html_content_type(content_type: &str) -> bool {
    let lowered = content_type.to_ascii_lowercase();
    lowered.contains("text/html") || lowered.contains("application/xhtml+xml")
}

fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RE.replace_all(s, " ").trim().to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
