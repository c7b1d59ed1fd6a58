//! Persisted data model: crawl snapshots, diff results, and the article catalog.
//!
//! Field names are camelCase on disk; the catalog is read by the agent
//! toolbox UI as a search corpus.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title recorded for a non-2xx response.
pub const FETCH_FAILED_TITLE: &str = "Fetch Failed";

/// Title recorded when the request itself raised an error.
pub const FETCH_ERROR_TITLE: &str = "Fetch Error";

/// Title used when an HTML page has no usable `<title>`.
pub const UNTITLED: &str = "Untitled";

// ---------------------------------------------------------------------------
// Crawl snapshot
// ---------------------------------------------------------------------------

/// One entry per visited URL. Failed fetches are still records, with sentinel fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Absolute, fragment-stripped URL. Identity key.
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    /// HTTP status, or `0` when the request raised an error.
    pub status_code: u16,
    /// Raw `Content-Type` header value, or empty.
    #[serde(default)]
    pub content_type: String,
    pub title: String,
    /// Visible text, capped in length. Empty for anything but OK HTML.
    #[serde(default)]
    pub text: String,
    /// SHA-256 of `text`, or of the failure signature when there is no text.
    pub hash: String,
    /// Discovered links that pass the allow/deny policy.
    #[serde(default)]
    pub links: Vec<String>,
    /// Discovered PDF links.
    #[serde(default)]
    pub pdf_links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageRecord {
    /// Whether the title is one of the fetch-failure sentinels.
    pub fn has_failure_title(&self) -> bool {
        is_failure_title(&self.title)
    }
}

/// Whether `title` is one of the fetch-failure sentinels.
pub fn is_failure_title(title: &str) -> bool {
    title == FETCH_FAILED_TITLE || title == FETCH_ERROR_TITLE
}

/// A complete, point-in-time capture of one crawl run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlSnapshot {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub page_count: usize,
    /// Longest anchor label seen per URL across the whole crawl.
    #[serde(default)]
    pub link_label_map: BTreeMap<String, String>,
    pub pages: Vec<PageRecord>,
}

// ---------------------------------------------------------------------------
// Diff result
// ---------------------------------------------------------------------------

/// Sizes of the four diff partitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffCounts {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub unchanged: usize,
}

/// URL-keyed comparison of the latest snapshot against the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub generated_at: DateTime<Utc>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
    pub unchanged: Vec<String>,
    pub counts: DiffCounts,
}

// ---------------------------------------------------------------------------
// Article catalog
// ---------------------------------------------------------------------------

/// Whether an entry was built from crawled content or kept as a bare link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryStatus {
    #[default]
    Active,
    LinkOnly,
}

/// A durable knowledge-base record.
///
/// `steps`, `required_documents`, `contacts` and `deadlines` are curated by
/// editors. The pipeline only ever carries them forward; their shape is
/// opaque to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleEntry {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub steps: Vec<serde_json::Value>,
    #[serde(default)]
    pub required_documents: Vec<serde_json::Value>,
    #[serde(default)]
    pub contacts: Vec<serde_json::Value>,
    #[serde(default)]
    pub deadlines: Vec<serde_json::Value>,
    #[serde(default)]
    pub related_links: Vec<String>,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_hash: String,
    #[serde(default)]
    pub status: EntryStatus,
    #[serde(default)]
    pub change_notes: String,
}

/// The persisted knowledge base (`articles.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleCatalog {
    pub generated_at: DateTime<Utc>,
    pub entry_count: usize,
    pub entries: Vec<ArticleEntry>,
}

impl ArticleCatalog {
    /// Build a catalog, keeping `entry_count` in sync with `entries`.
    pub fn new(generated_at: DateTime<Utc>, entries: Vec<ArticleEntry>) -> Self {
        Self {
            generated_at,
            entry_count: entries.len(),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> PageRecord {
        PageRecord {
            url: "https://des.az.gov/services/employment/unemployment-individual".into(),
            fetched_at: Utc::now(),
            status_code: 200,
            content_type: "text/html; charset=utf-8".into(),
            title: "Unemployment Insurance".into(),
            text: "File a weekly claim.".into(),
            hash: crate::hash_text("File a weekly claim."),
            links: vec![],
            pdf_links: vec![],
            error: None,
        }
    }

    #[test]
    fn page_record_serializes_camel_case_without_error() {
        let json = serde_json::to_string(&sample_page()).expect("serialize");
        assert!(json.contains("\"statusCode\":200"));
        assert!(json.contains("\"pdfLinks\""));
        assert!(json.contains("\"fetchedAt\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn snapshot_without_label_map_deserializes() {
        let json = r#"{
            "startedAt": "2026-01-05T10:00:00.000Z",
            "completedAt": "2026-01-05T10:05:00.000Z",
            "pageCount": 1,
            "pages": [{
                "url": "https://a.gov/x",
                "fetchedAt": "2026-01-05T10:00:01.000Z",
                "statusCode": 0,
                "contentType": "",
                "title": "Fetch Error",
                "text": "",
                "hash": "abc",
                "links": [],
                "pdfLinks": [],
                "error": "connection refused"
            }]
        }"#;
        let snapshot: CrawlSnapshot = serde_json::from_str(json).expect("parse");
        assert!(snapshot.link_label_map.is_empty());
        assert!(snapshot.pages[0].has_failure_title());
        assert_eq!(snapshot.pages[0].error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn entry_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&EntryStatus::LinkOnly).unwrap(),
            "\"link-only\""
        );
        assert_eq!(serde_json::to_string(&EntryStatus::Active).unwrap(), "\"active\"");
    }

    #[test]
    fn curated_fields_roundtrip_verbatim() {
        let json = r#"{
            "id": "kb_0123456789ab",
            "title": "Appeals",
            "steps": ["File within 30 days", {"text": "Call", "phone": "602-000-0000"}],
            "requiredDocuments": ["Determination letter"],
            "sourceUrl": "https://a.gov/appeals",
            "status": "active"
        }"#;
        let entry: ArticleEntry = serde_json::from_str(json).expect("parse");
        assert_eq!(entry.steps.len(), 2);
        assert!(entry.contacts.is_empty());
        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["steps"][1]["phone"], "602-000-0000");
        assert_eq!(back["requiredDocuments"][0], "Determination letter");
    }

    #[test]
    fn catalog_entry_count_tracks_entries() {
        let catalog = ArticleCatalog::new(Utc::now(), vec![]);
        assert_eq!(catalog.entry_count, 0);
    }
}
