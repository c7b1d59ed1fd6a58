//! Crawl configuration for the knowledge-base pipeline.
//!
//! The config lives at `kb/config.json` (or `kb/config.toml`) under the
//! workspace root. It is read once per crawl run and validated before use.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{KbError, Result};

/// Primary identifying user-agent, tried first on every fetch.
pub const BOT_USER_AGENT: &str = "azui-kb-bot/1.0";

/// Default knowledge-base scope for the catalog updater.
pub const DEFAULT_CATALOG_SCOPE: &str = "des.az.gov/services/employment/unemployment-individual";

// ---------------------------------------------------------------------------
// CrawlConfig
// ---------------------------------------------------------------------------

/// Crawl configuration, deserialized from `kb/config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlConfig {
    /// URLs the frontier starts from.
    pub seed_urls: Vec<String>,

    /// A URL is crawlable only if it starts with one of these.
    pub allow_prefixes: Vec<String>,

    /// A URL containing any of these substrings is never crawled.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Pause after every visited URL, in milliseconds.
    #[serde(default = "default_crawl_delay")]
    pub crawl_delay_ms: u64,

    /// Upper bound on produced page records.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Queue PDF links even when they fall outside the allow-list.
    #[serde(default)]
    pub include_pdf_links: bool,

    /// Per-request timeout in seconds (`0` disables it).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// URL substring a page must contain to enter the article catalog.
    #[serde(default = "default_catalog_scope")]
    pub catalog_scope: String,

    /// Ordered user-agent profiles for the 403 fallback chain.
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seed_urls: vec![
                "https://des.az.gov/services/employment/unemployment-individual".into(),
            ],
            allow_prefixes: vec![
                "https://des.az.gov/services/employment/unemployment-individual".into(),
                "https://des.az.gov/documents".into(),
            ],
            exclude_patterns: vec!["/search".into(), "?page=".into(), "/user/".into()],
            crawl_delay_ms: default_crawl_delay(),
            max_pages: default_max_pages(),
            include_pdf_links: true,
            request_timeout_secs: default_request_timeout(),
            catalog_scope: default_catalog_scope(),
            user_agents: default_user_agents(),
        }
    }
}

fn default_crawl_delay() -> u64 {
    1000
}
fn default_max_pages() -> usize {
    200
}
fn default_request_timeout() -> u64 {
    30
}
fn default_catalog_scope() -> String {
    DEFAULT_CATALOG_SCOPE.into()
}
fn default_user_agents() -> Vec<String> {
    vec![
        BOT_USER_AGENT.into(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36".into(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15".into(),
    ]
}

impl CrawlConfig {
    /// Check the invariants the crawl loop relies on.
    pub fn validate(&self) -> Result<()> {
        if self.seed_urls.is_empty() {
            return Err(KbError::config("seedUrls must contain at least one URL"));
        }
        for seed in &self.seed_urls {
            let parsed = Url::parse(seed)
                .map_err(|e| KbError::config(format!("invalid seed URL '{seed}': {e}")))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(KbError::config(format!(
                    "seed URL '{seed}' must use http or https"
                )));
            }
        }
        if self.allow_prefixes.iter().all(|p| p.trim().is_empty()) {
            return Err(KbError::config(
                "allowPrefixes must contain at least one non-empty prefix",
            ));
        }
        if self.max_pages == 0 {
            return Err(KbError::config("maxPages must be at least 1"));
        }
        if self.user_agents.is_empty() {
            return Err(KbError::config("userAgents must not be empty"));
        }
        Ok(())
    }

    /// Render as pretty JSON (the on-disk format written by `config init`).
    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| KbError::config(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load and validate a config file. `.toml` files are parsed as TOML,
/// everything else as JSON.
pub fn load_config_from(path: &Path) -> Result<CrawlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| KbError::io(path, e))?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let config: CrawlConfig = if is_toml {
        toml::from_str(&content)
            .map_err(|e| KbError::config(format!("failed to parse {}: {e}", path.display())))?
    } else {
        serde_json::from_str(&content)
            .map_err(|e| KbError::config(format!("failed to parse {}: {e}", path.display())))?
    };

    config.validate()?;
    tracing::debug!(?path, seeds = config.seed_urls.len(), "loaded crawl config");

    Ok(config)
}
