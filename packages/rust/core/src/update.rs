//! Catalog updater: folds the latest crawl into the persisted article catalog.
//!
//! The catalog is rebuilt on every run from the in-scope pages of the latest
//! snapshot. Content-derived fields come from the fresh crawl; the curated
//! fields (`steps`, `requiredDocuments`, `contacts`, `deadlines`) are only
//! ever carried forward from the prior entry for the same source URL.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use url::Url;

use azui_kb_shared::{
    ArticleCatalog, ArticleEntry, CrawlSnapshot, EntryStatus, PageRecord, UNTITLED, hash_text,
    is_failure_title,
};

/// Summary excerpt budget, in characters.
pub const SUMMARY_MAX_CHARS: usize = 260;

/// Upper bound on `relatedLinks` per entry.
pub const RELATED_LINKS_CAP: usize = 40;

pub const CONTENT_CHANGED_NOTE: &str = "Content changed during latest crawl.";
pub const LINK_ONLY_NOTE: &str =
    "Source page could not be crawled during the latest run; kept as a link-only entry.";
pub const LINK_ONLY_SUMMARY: &str = "This page could not be crawled automatically. \
     Open the source link for the current official details.";
pub const EMPTY_TEXT_SUMMARY: &str = "Source imported. Summary pending review.";
pub const FALLBACK_LINK_TITLE: &str = "Linked Resource";
pub const DEFAULT_TOPIC: &str = "General UI Benefits";

/// Ordered topic rules; first match on the lowercased `url + " " + title` wins.
const TOPIC_RULES: &[(&[&str], &str)] = &[
    (&["overpayment"], "Overpayments"),
    (&["appeal"], "Appeals"),
    (&["weekly", "claim"], "Weekly Claims"),
    (&["id.me", "identity"], "Identity Verification"),
    (&["fraud"], "Fraud"),
    (&["tax", "1099"], "Tax"),
    (&["eligibility"], "Eligibility"),
];

// ---------------------------------------------------------------------------
// Field derivation
// ---------------------------------------------------------------------------

/// Stable catalog id for a source URL: `kb_` + 12 hex chars of its SHA-256.
pub fn make_id(url: &str) -> String {
    format!("kb_{}", &hash_text(url)[..12])
}

/// Keyword-rule topic for a page.
pub fn infer_topic(url: &str, title: &str) -> &'static str {
    let haystack = format!("{url} {title}").to_lowercase();
    TOPIC_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(_, topic)| *topic)
        .unwrap_or(DEFAULT_TOPIC)
}

/// First [`SUMMARY_MAX_CHARS`] characters of `text`, trimmed, with an
/// ellipsis unless it ends on sentence punctuation.
pub fn to_summary(text: &str) -> String {
    if text.trim().is_empty() {
        return EMPTY_TEXT_SUMMARY.to_string();
    }
    let cut: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
    let trimmed = cut.trim();
    if trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{trimmed}...")
    }
}

/// Page links then PDF links, deduplicated, capped at [`RELATED_LINKS_CAP`].
pub fn related_links(page: &PageRecord) -> Vec<String> {
    let mut seen = HashSet::new();
    page.links
        .iter()
        .chain(&page.pdf_links)
        .filter(|l| seen.insert(l.as_str()))
        .take(RELATED_LINKS_CAP)
        .cloned()
        .collect()
}

/// HTTP 200, a real title, and some extracted text.
pub fn is_valid_page(page: &PageRecord) -> bool {
    page.status_code == 200 && !is_failure_title(&page.title) && !page.text.trim().is_empty()
}

/// Title synthesized from the last path segment: `weekly-claims_faq.html` → `Weekly Claims Faq`.
pub fn title_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()?
        .to_string();

    let stem = match segment.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => segment.as_str(),
    };

    let words: Vec<String> = stem
        .replace(['-', '_'], " ")
        .replace("%20", " ")
        .split_whitespace()
        .map(capitalize)
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A stored title worth reusing for a link-only entry.
fn is_usable_title(title: &str, url: &str) -> bool {
    let title = title.trim();
    !title.is_empty()
        && !is_failure_title(title)
        && title != UNTITLED
        && title != FALLBACK_LINK_TITLE
        && title != url
}

/// Title for a page that could not be crawled: anchor label, then previous
/// usable title, then a URL-derived title, then a generic label.
pub fn resolve_link_only_title(
    url: &str,
    existing: Option<&ArticleEntry>,
    link_labels: &BTreeMap<String, String>,
) -> String {
    if let Some(label) = link_labels.get(url).filter(|l| !l.trim().is_empty()) {
        return label.trim().to_string();
    }
    if let Some(entry) = existing.filter(|e| is_usable_title(&e.title, url)) {
        return entry.title.trim().to_string();
    }
    title_from_url(url).unwrap_or_else(|| FALLBACK_LINK_TITLE.to_string())
}

// ---------------------------------------------------------------------------
// Entry construction
// ---------------------------------------------------------------------------

/// Existing id when it is non-blank, else a fresh one from the URL.
fn entry_id(url: &str, existing: Option<&ArticleEntry>) -> String {
    existing
        .map(|e| e.id.trim())
        .filter(|id| !id.is_empty())
        .map_or_else(|| make_id(url), str::to_string)
}

fn active_entry(page: &PageRecord, existing: Option<&ArticleEntry>, now: DateTime<Utc>) -> ArticleEntry {
    let title = if !page.title.trim().is_empty() {
        page.title.clone()
    } else {
        existing
            .map(|e| e.title.clone())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNTITLED.to_string())
    };

    let change_notes = match existing {
        Some(e) if e.source_hash != page.hash => CONTENT_CHANGED_NOTE.to_string(),
        Some(e) => e.change_notes.clone(),
        None => String::new(),
    };

    ArticleEntry {
        id: entry_id(&page.url, existing),
        topic: infer_topic(&page.url, &title).to_string(),
        title,
        summary: to_summary(&page.text),
        steps: existing.map(|e| e.steps.clone()).unwrap_or_default(),
        required_documents: existing.map(|e| e.required_documents.clone()).unwrap_or_default(),
        contacts: existing.map(|e| e.contacts.clone()).unwrap_or_default(),
        deadlines: existing.map(|e| e.deadlines.clone()).unwrap_or_default(),
        related_links: related_links(page),
        source_url: page.url.clone(),
        source_last_seen: Some(now),
        source_hash: page.hash.clone(),
        status: EntryStatus::Active,
        change_notes,
    }
}

fn link_only_entry(
    page: &PageRecord,
    existing: Option<&ArticleEntry>,
    link_labels: &BTreeMap<String, String>,
    now: DateTime<Utc>,
) -> ArticleEntry {
    let title = resolve_link_only_title(&page.url, existing, link_labels);
    let source_hash = existing
        .map(|e| e.source_hash.clone())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| page.hash.clone());

    ArticleEntry {
        id: entry_id(&page.url, existing),
        topic: infer_topic(&page.url, &title).to_string(),
        title,
        summary: LINK_ONLY_SUMMARY.to_string(),
        steps: existing.map(|e| e.steps.clone()).unwrap_or_default(),
        required_documents: existing.map(|e| e.required_documents.clone()).unwrap_or_default(),
        contacts: existing.map(|e| e.contacts.clone()).unwrap_or_default(),
        deadlines: existing.map(|e| e.deadlines.clone()).unwrap_or_default(),
        related_links: existing.map(|e| e.related_links.clone()).unwrap_or_default(),
        source_url: page.url.clone(),
        source_last_seen: Some(now),
        source_hash,
        status: EntryStatus::LinkOnly,
        change_notes: LINK_ONLY_NOTE.to_string(),
    }
}

/// Rebuild the catalog from the in-scope pages of `snapshot`.
///
/// Pages whose URL does not contain `scope` are ignored; prior entries whose
/// URL is absent from the snapshot are dropped.
pub fn build_catalog(
    snapshot: &CrawlSnapshot,
    existing: Option<&ArticleCatalog>,
    scope: &str,
    now: DateTime<Utc>,
) -> ArticleCatalog {
    let by_source: HashMap<&str, &ArticleEntry> = existing
        .map(|c| c.entries.iter().map(|e| (e.source_url.as_str(), e)).collect())
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for page in &snapshot.pages {
        if !page.url.contains(scope) || !seen.insert(page.url.as_str()) {
            continue;
        }
        let prior = by_source.get(page.url.as_str()).copied();
        let entry = if is_valid_page(page) {
            active_entry(page, prior, now)
        } else {
            link_only_entry(page, prior, &snapshot.link_label_map, now)
        };
        entries.push(entry);
    }

    ArticleCatalog::new(now, entries)
}
