//! Shared types, error model, and configuration for the knowledge-base pipeline.
//!
//! This crate is the foundation depended on by all other pipeline crates.
//! It provides:
//! - [`KbError`]: the unified error type
//! - The persisted data model ([`CrawlSnapshot`], [`DiffResult`], [`ArticleCatalog`])
//! - Crawl configuration ([`CrawlConfig`], config loading and validation)
//! - Content hashing ([`hash_text`])

pub mod config;
pub mod error;
pub mod hash;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{BOT_USER_AGENT, CrawlConfig, DEFAULT_CATALOG_SCOPE, load_config_from};
pub use error::{KbError, Result};
pub use hash::hash_text;
pub use types::{
    ArticleCatalog, ArticleEntry, CrawlSnapshot, DiffCounts, DiffResult, EntryStatus,
    FETCH_ERROR_TITLE, FETCH_FAILED_TITLE, PageRecord, UNTITLED, is_failure_title,
};
