//! Web crawler for the knowledge-base pipeline.
//!
//! This crate provides:
//! - [`engine`]: sequential, polite, bounded crawler producing a [`CrawlSnapshot`](azui_kb_shared::CrawlSnapshot)
//! - [`policy`]: the allow/deny rules for the frontier
//! - [`fetch`]: HTTP fetching with the user-agent fallback chain
//! - [`extract`]: title, visible text, and anchor extraction

pub mod engine;
pub mod extract;
pub mod fetch;
pub mod policy;

pub use engine::{CrawlSession, Crawler, ProgressReporter, SilentProgress};
pub use extract::{Anchor, ExtractedPage, MAX_TEXT_CHARS};
pub use fetch::{Fetcher, should_fall_back};
pub use policy::{UrlPolicy, looks_like_pdf};
