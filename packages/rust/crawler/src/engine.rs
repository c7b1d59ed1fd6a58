//! Sequential, polite, bounded web crawler engine.
//!
//! The crawler walks a FIFO frontier from the configured seeds, visits each
//! allowed URL at most once, sleeps for the configured delay after every
//! visit, and stops when the frontier empties or `max_pages` records exist.
//! Every visited URL yields exactly one [`PageRecord`]; fetch failures are
//! captured as degraded records and never abort the crawl.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, instrument, warn};
use url::Url;

use azui_kb_shared::{
    CrawlConfig, CrawlSnapshot, FETCH_ERROR_TITLE, FETCH_FAILED_TITLE, PageRecord, Result,
    hash_text,
};

use crate::extract::{self, is_html_content_type, unique_links};
use crate::fetch::Fetcher;
use crate::policy::{UrlPolicy, looks_like_pdf};

/// Anchor labels shorter than this (after trimming) are ignored.
const MIN_LABEL_LEN: usize = 3;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting crawl status.
pub trait ProgressReporter: Send + Sync {
    /// Called after each visited URL has produced its record.
    fn page_fetched(&self, url: &str, status_code: u16, current: usize, max_pages: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn page_fetched(&self, _url: &str, _status_code: u16, _current: usize, _max_pages: usize) {}
}

// ---------------------------------------------------------------------------
// CrawlSession
// ---------------------------------------------------------------------------

/// Mutable state of one crawl run. Owned by [`Crawler::crawl`].
#[derive(Debug, Default)]
pub struct CrawlSession {
    queue: VecDeque<String>,
    visited: HashSet<String>,
    pages: Vec<PageRecord>,
    link_labels: BTreeMap<String, String>,
}

impl CrawlSession {
    /// Start a session with the seeds queued in order.
    pub fn new(seeds: &[String]) -> Self {
        Self {
            queue: seeds.iter().cloned().collect(),
            ..Self::default()
        }
    }

    /// Pop queue entries until one may be visited; mark it visited.
    ///
    /// Empty, already-visited, and disallowed entries are dropped without
    /// producing a record. Queued PDF links outside the allow list end here.
    pub fn next_candidate(&mut self, policy: &UrlPolicy) -> Option<String> {
        while let Some(url) = self.queue.pop_front() {
            if url.trim().is_empty() || self.visited.contains(&url) || !policy.is_allowed(&url) {
                continue;
            }
            self.visited.insert(url.clone());
            return Some(url);
        }
        None
    }

    /// Queue every not-yet-visited link the policy admits.
    pub fn enqueue_links(&mut self, links: &[String], policy: &UrlPolicy) {
        for link in links {
            if !self.visited.contains(link) && policy.should_enqueue(link) {
                self.queue.push_back(link.clone());
            }
        }
    }

    /// Keep the longest non-trivial label seen for `url`.
    pub fn register_label(&mut self, url: &str, label: &str) {
        let trimmed = label.trim();
        if trimmed.chars().count() < MIN_LABEL_LEN {
            return;
        }
        let longer = self
            .link_labels
            .get(url)
            .is_none_or(|existing| existing.chars().count() < trimmed.chars().count());
        if longer {
            self.link_labels.insert(url.to_string(), trimmed.to_string());
        }
    }

    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    pub fn link_labels(&self) -> &BTreeMap<String, String> {
        &self.link_labels
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Breadth-first crawler over the configured frontier.
pub struct Crawler {
    config: CrawlConfig,
    policy: UrlPolicy,
    fetcher: Fetcher,
}

impl Crawler {
    /// Create a new crawler with the given configuration.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let fetcher = Fetcher::new(&config)?;
        let policy = UrlPolicy::from_config(&config);
        Ok(Self {
            config,
            policy,
            fetcher,
        })
    }

    pub fn policy(&self) -> &UrlPolicy {
        &self.policy
    }

    /// Run one crawl to completion and return its snapshot.
    ///
    /// Infallible by construction: per-URL problems become degraded records.
    #[instrument(skip_all, fields(seeds = self.config.seed_urls.len()))]
    pub async fn crawl(&self, progress: &dyn ProgressReporter) -> CrawlSnapshot {
        let started_at = Utc::now();
        let start_time = Instant::now();
        let max_pages = self.config.max_pages;
        let delay = Duration::from_millis(self.config.crawl_delay_ms);

        info!(
            max_pages,
            crawl_delay_ms = self.config.crawl_delay_ms,
            include_pdf_links = self.config.include_pdf_links,
            "starting crawl"
        );

        let mut session = CrawlSession::new(&self.config.seed_urls);

        while session.pages.len() < max_pages {
            let Some(url) = session.next_candidate(&self.policy) else {
                break;
            };

            let record = self.visit(&url, &mut session).await;
            debug!(
                url = %record.url,
                status = record.status_code,
                title = %record.title,
                links = record.links.len(),
                "visited"
            );
            progress.page_fetched(&record.url, record.status_code, session.pages.len() + 1, max_pages);
            session.pages.push(record);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let failed = session
            .pages
            .iter()
            .filter(|p| p.has_failure_title())
            .count();

        info!(
            pages = session.pages.len(),
            failed,
            queued_remaining = session.queue.len(),
            link_labels = session.link_labels.len(),
            duration_ms = start_time.elapsed().as_millis(),
            "crawl completed"
        );

        CrawlSnapshot {
            started_at,
            completed_at: Utc::now(),
            page_count: session.pages.len(),
            link_label_map: session.link_labels,
            pages: session.pages,
        }
    }

    /// Fetch one URL and classify the outcome into a record.
    async fn visit(&self, url: &str, session: &mut CrawlSession) -> PageRecord {
        let response = match self.fetcher.fetch(url).await {
            Ok(response) => response,
            Err(e) => return error_record(url, &e.to_string()),
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let fetched_at = Utc::now();

        if !status.is_success() {
            return PageRecord {
                url: url.to_string(),
                fetched_at,
                status_code: status.as_u16(),
                content_type,
                title: FETCH_FAILED_TITLE.to_string(),
                text: String::new(),
                hash: hash_text(&status.as_u16().to_string()),
                links: Vec::new(),
                pdf_links: Vec::new(),
                error: None,
            };
        }

        if !is_html_content_type(&content_type) {
            return PageRecord {
                url: url.to_string(),
                fetched_at,
                status_code: status.as_u16(),
                content_type,
                title: url.to_string(),
                text: String::new(),
                hash: hash_text(url),
                links: Vec::new(),
                pdf_links: Vec::new(),
                error: None,
            };
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return error_record(url, &e.to_string()),
        };
        let base = match Url::parse(url) {
            Ok(base) => base,
            Err(e) => return error_record(url, &e.to_string()),
        };

        let page = extract::extract(&body, &base);

        for anchor in &page.anchors {
            session.register_label(&anchor.url, &anchor.label);
        }

        let links = unique_links(&page.anchors);
        session.enqueue_links(&links, &self.policy);

        let pdf_links = if self.config.include_pdf_links {
            links.iter().filter(|l| looks_like_pdf(l)).cloned().collect()
        } else {
            Vec::new()
        };

        PageRecord {
            url: url.to_string(),
            fetched_at,
            status_code: status.as_u16(),
            content_type,
            title: page.title,
            hash: hash_text(&page.text),
            text: page.text,
            links: links.into_iter().filter(|l| self.policy.is_allowed(l)).collect(),
            pdf_links,
            error: None,
        }
    }
}

/// Record for a request that raised instead of returning a response.
fn error_record(url: &str, message: &str) -> PageRecord {
    warn!(url, error = %message, "fetch error");
    PageRecord {
        url: url.to_string(),
        fetched_at: Utc::now(),
        status_code: 0,
        content_type: String::new(),
        title: FETCH_ERROR_TITLE.to_string(),
        text: String::new(),
        hash: hash_text(message),
        links: Vec::new(),
        pdf_links: Vec::new(),
        error: Some(message.to_string()),
    }
}

#[cfg(test)]
mod crawler_tests {
    use super::*;
    use azui_kb_shared::UNTITLED;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8")
    }

    fn config_for(server: &MockServer, seeds: &[&str], max_pages: usize) -> CrawlConfig {
        CrawlConfig {
            seed_urls: seeds.iter().map(|s| format!("{}{s}", server.uri())).collect(),
            allow_prefixes: vec![server.uri()],
            exclude_patterns: vec!["/private".into()],
            crawl_delay_ms: 0,
            max_pages,
            include_pdf_links: false,
            request_timeout_secs: 5,
            ..CrawlConfig::default()
        }
    }

    async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(server)
            .await;
    }

    // -----------------------------------------------------------------------
    // Session unit tests
    // -----------------------------------------------------------------------

    #[test]
    fn session_skips_empty_visited_and_disallowed() {
        let policy = UrlPolicy::new(vec!["https://a.gov/".into()], vec!["/skip".into()], false);
        let mut session = CrawlSession::new(&[
            "".into(),
            "https://a.gov/1".into(),
            "https://b.gov/1".into(),
            "https://a.gov/skip".into(),
            "https://a.gov/1".into(),
            "https://a.gov/2".into(),
        ]);

        assert_eq!(session.next_candidate(&policy).as_deref(), Some("https://a.gov/1"));
        assert_eq!(session.next_candidate(&policy).as_deref(), Some("https://a.gov/2"));
        assert_eq!(session.next_candidate(&policy), None);
        assert!(session.is_visited("https://a.gov/1"));
        assert!(!session.is_visited("https://b.gov/1"));
    }

    #[test]
    fn session_queues_pdf_but_skips_it_at_dequeue() {
        let policy = UrlPolicy::new(vec!["https://a.gov/ui/".into()], vec![], true);
        let mut session = CrawlSession::new(&[]);
        session.enqueue_links(
            &["https://a.gov/docs/form.pdf".into(), "https://a.gov/ui/next".into()],
            &policy,
        );
        assert_eq!(session.next_candidate(&policy).as_deref(), Some("https://a.gov/ui/next"));
        assert_eq!(session.next_candidate(&policy), None);
        assert!(!session.is_visited("https://a.gov/docs/form.pdf"));
    }

    #[test]
    fn session_keeps_longest_label() {
        let mut session = CrawlSession::new(&[]);
        session.register_label("https://a.gov/x", "Go");
        assert!(session.link_labels().is_empty());

        session.register_label("https://a.gov/x", "  Appeals  ");
        session.register_label("https://a.gov/x", "File an appeal online");
        session.register_label("https://a.gov/x", "Appeal");
        assert_eq!(session.link_labels()["https://a.gov/x"], "File an appeal online");
    }

    #[test]
    fn session_enqueue_ignores_visited() {
        let policy = UrlPolicy::new(vec!["https://a.gov/".into()], vec![], false);
        let mut session = CrawlSession::new(&["https://a.gov/".into()]);
        let first = session.next_candidate(&policy).unwrap();
        session.enqueue_links(
            &[first.clone(), "https://a.gov/next".into(), "https://b.gov/".into()],
            &policy,
        );
        assert_eq!(session.next_candidate(&policy).as_deref(), Some("https://a.gov/next"));
        assert_eq!(session.next_candidate(&policy), None);
    }

    // -----------------------------------------------------------------------
    // Crawl loop against a mock server
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn first_crawl_single_page() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/ui",
            html("<html><head><title>Unemployment</title></head><body><p>Apply today.</p><a href=\"/ui/next\">Next</a></body></html>"),
        )
        .await;

        let crawler = Crawler::new(config_for(&server, &["/ui"], 1)).unwrap();
        let snapshot = crawler.crawl(&SilentProgress).await;

        assert_eq!(snapshot.page_count, 1);
        let page = &snapshot.pages[0];
        assert_eq!(page.url, format!("{}/ui", server.uri()));
        assert_eq!(page.status_code, 200);
        assert_eq!(page.title, "Unemployment");
        assert!(page.text.contains("Apply today."));
        assert_eq!(page.hash, hash_text(&page.text));
        assert!(!page.hash.is_empty());
        assert_eq!(page.links, vec![format!("{}/ui/next", server.uri())]);
    }

    #[tokio::test]
    async fn bfs_visits_each_url_once() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/",
            html(r#"<html><body>
                <a href="/a">A</a><a href="/b">B</a><a href="/a#frag">A again</a>
                <a href="/private/x">Private</a><a href="https://elsewhere.example/">Out</a>
            </body></html>"#),
        )
        .await;
        mount(&server, "/a", html(r#"<html><body><a href="/">Home</a><a href="/b">B</a></body></html>"#)).await;
        mount(&server, "/b", html(r#"<html><body><a href="/a">A</a></body></html>"#)).await;

        let crawler = Crawler::new(config_for(&server, &["/"], 50)).unwrap();
        let snapshot = crawler.crawl(&SilentProgress).await;

        let urls: Vec<String> = snapshot.pages.iter().map(|p| p.url.clone()).collect();
        assert_eq!(
            urls,
            vec![
                format!("{}/", server.uri()),
                format!("{}/a", server.uri()),
                format!("{}/b", server.uri()),
            ]
        );
        let unique: HashSet<&String> = urls.iter().collect();
        assert_eq!(unique.len(), urls.len());
        assert!(!snapshot.pages[0].links.iter().any(|l| l.contains("/private")));
        assert_eq!(snapshot.link_label_map[&format!("{}/a", server.uri())], "A again");
    }

    #[tokio::test]
    async fn never_exceeds_max_pages() {
        let server = MockServer::start().await;
        let links: String = (0..10).map(|i| format!("<a href=\"/p{i}\">Page {i}</a>")).collect();
        mount(&server, "/", html(&format!("<html><body>{links}</body></html>"))).await;
        for i in 0..10 {
            mount(&server, &format!("/p{i}"), html("<html><body>leaf</body></html>")).await;
        }

        let crawler = Crawler::new(config_for(&server, &["/"], 4)).unwrap();
        let snapshot = crawler.crawl(&SilentProgress).await;
        assert_eq!(snapshot.page_count, 4);
        assert_eq!(snapshot.pages.len(), 4);
    }

    #[tokio::test]
    async fn not_found_is_fetch_failed() {
        let server = MockServer::start().await;
        mount(&server, "/missing", ResponseTemplate::new(404)).await;

        let crawler = Crawler::new(config_for(&server, &["/missing"], 5)).unwrap();
        let snapshot = crawler.crawl(&SilentProgress).await;

        let page = &snapshot.pages[0];
        assert_eq!(page.status_code, 404);
        assert_eq!(page.title, FETCH_FAILED_TITLE);
        assert_eq!(page.text, "");
        assert_eq!(page.hash, hash_text("404"));
        assert!(page.error.is_none());
    }

    #[tokio::test]
    async fn non_html_hashes_url() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/forms/ub-105.pdf",
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.7".to_vec(), "application/pdf"),
        )
        .await;

        let crawler = Crawler::new(config_for(&server, &["/forms/ub-105.pdf"], 5)).unwrap();
        let snapshot = crawler.crawl(&SilentProgress).await;

        let page = &snapshot.pages[0];
        assert_eq!(page.status_code, 200);
        assert_eq!(page.content_type, "application/pdf");
        assert_eq!(page.title, page.url);
        assert_eq!(page.text, "");
        assert_eq!(page.hash, hash_text(&page.url));
    }

    #[tokio::test]
    async fn pdf_links_collected_but_not_fetched_outside_allow_list() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/ui/",
            html(r#"<html><head><title>Forms</title></head><body>
                <a href="/docs/ub-105.pdf">Claim form</a>
                <a href="/ui/next">Next</a>
            </body></html>"#),
        )
        .await;
        mount(&server, "/ui/next", html("<html><body>next</body></html>")).await;
        Mock::given(method("GET"))
            .and(path("/docs/ub-105.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF".to_vec(), "application/pdf"))
            .expect(0)
            .mount(&server)
            .await;

        let config = CrawlConfig {
            allow_prefixes: vec![format!("{}/ui/", server.uri())],
            include_pdf_links: true,
            ..config_for(&server, &["/ui/"], 10)
        };
        let crawler = Crawler::new(config).unwrap();
        let snapshot = crawler.crawl(&SilentProgress).await;

        let pdf = format!("{}/docs/ub-105.pdf", server.uri());
        assert_eq!(snapshot.pages[0].pdf_links, vec![pdf.clone()]);
        assert!(!snapshot.pages[0].links.contains(&pdf));
        assert!(snapshot.pages.iter().all(|p| p.url != pdf));
        assert_eq!(snapshot.page_count, 2);
    }

    #[tokio::test]
    async fn connection_error_is_fetch_error() {
        // Nothing listens on port 1.
        let config = CrawlConfig {
            seed_urls: vec!["http://127.0.0.1:1/ui".into()],
            allow_prefixes: vec!["http://127.0.0.1:1/".into()],
            exclude_patterns: vec![],
            crawl_delay_ms: 0,
            max_pages: 3,
            request_timeout_secs: 5,
            ..CrawlConfig::default()
        };
        let crawler = Crawler::new(config).unwrap();
        let snapshot = crawler.crawl(&SilentProgress).await;

        assert_eq!(snapshot.page_count, 1);
        let page = &snapshot.pages[0];
        assert_eq!(page.status_code, 0);
        assert_eq!(page.title, FETCH_ERROR_TITLE);
        let message = page.error.clone().expect("error populated");
        assert_eq!(page.hash, hash_text(&message));
    }

    #[tokio::test]
    async fn blank_title_falls_back() {
        let server = MockServer::start().await;
        mount(&server, "/", html("<html><body><p>Body only</p></body></html>")).await;

        let crawler = Crawler::new(config_for(&server, &["/"], 1)).unwrap();
        let snapshot = crawler.crawl(&SilentProgress).await;
        assert_eq!(snapshot.pages[0].title, UNTITLED);
    }

    #[tokio::test]
    async fn delay_applies_per_visit() {
        let server = MockServer::start().await;
        mount(&server, "/", html(r#"<html><body><a href="/a">A</a></body></html>"#)).await;
        mount(&server, "/a", ResponseTemplate::new(500)).await;

        let config = CrawlConfig {
            crawl_delay_ms: 60,
            ..config_for(&server, &["/"], 10)
        };
        let crawler = Crawler::new(config).unwrap();
        let start = Instant::now();
        let snapshot = crawler.crawl(&SilentProgress).await;
        assert_eq!(snapshot.page_count, 2);
        assert!(start.elapsed() >= Duration::from_millis(120));
    }
}
