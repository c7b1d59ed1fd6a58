//! On-disk JSON store for the knowledge-base pipeline.
//!
//! The [`KbStore`] struct owns the `kb/` directory layout under a workspace root:
//!
//! ```text
//! <root>/kb/
//! ├── config.json            (or config.toml)
//! ├── data/
//! │   ├── crawl-latest.json
//! │   ├── crawl-previous.json
//! │   ├── diff-latest.json
//! │   └── articles.json
//! └── reports/
//!     ├── kb-update-<timestamp>.md
//!     └── latest.md
//! ```
//!
//! **Access rules:** every stage reads its inputs in full at start and writes
//! its output in full at the end. Writes go to a temp file and are renamed
//! into place.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use azui_kb_shared::{
    ArticleCatalog, CrawlConfig, CrawlSnapshot, DiffResult, KbError, Result, load_config_from,
};

const KB_DIR: &str = "kb";
const DATA_DIR: &str = "data";
const REPORTS_DIR: &str = "reports";

const CONFIG_JSON: &str = "config.json";
const CONFIG_TOML: &str = "config.toml";
const CRAWL_LATEST: &str = "crawl-latest.json";
const CRAWL_PREVIOUS: &str = "crawl-previous.json";
const DIFF_LATEST: &str = "diff-latest.json";
const ARTICLES: &str = "articles.json";
const REPORT_LATEST: &str = "latest.md";

/// Handle to the `kb/` directory of one workspace.
#[derive(Debug, Clone)]
pub struct KbStore {
    root: PathBuf,
}

impl KbStore {
    /// Create a store rooted at `root` (the directory that contains `kb/`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kb_dir(&self) -> PathBuf {
        self.root.join(KB_DIR)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.kb_dir().join(DATA_DIR)
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.kb_dir().join(REPORTS_DIR)
    }

    pub fn latest_snapshot_path(&self) -> PathBuf {
        self.data_dir().join(CRAWL_LATEST)
    }

    pub fn previous_snapshot_path(&self) -> PathBuf {
        self.data_dir().join(CRAWL_PREVIOUS)
    }

    pub fn diff_path(&self) -> PathBuf {
        self.data_dir().join(DIFF_LATEST)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir().join(ARTICLES)
    }

    // -----------------------------------------------------------------------
    // Config
    // -----------------------------------------------------------------------

    /// Path of the config file in effect: `config.json` if present, else
    /// `config.toml` if present, else the (missing) `config.json` path.
    pub fn config_path(&self) -> PathBuf {
        let json = self.kb_dir().join(CONFIG_JSON);
        if json.exists() {
            return json;
        }
        let toml = self.kb_dir().join(CONFIG_TOML);
        if toml.exists() {
            return toml;
        }
        json
    }

    /// Load and validate the crawl config. A missing file is fatal.
    pub fn load_config(&self) -> Result<CrawlConfig> {
        let path = self.config_path();
        if !path.exists() {
            return Err(KbError::missing_input(
                "crawl config",
                path,
                "Run `azui-kb config init` to create one.",
            ));
        }
        load_config_from(&path)
    }

    /// Write `config` as `kb/config.json`. Refuses to overwrite an existing config.
    pub fn init_config(&self, config: &CrawlConfig) -> Result<PathBuf> {
        let existing = self.config_path();
        if existing.exists() {
            return Err(KbError::config(format!(
                "config already exists at {}",
                existing.display()
            )));
        }
        let path = self.kb_dir().join(CONFIG_JSON);
        write_json(&path, config)?;
        info!(?path, "created default config file");
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    pub fn read_latest_snapshot(&self) -> Result<Option<CrawlSnapshot>> {
        read_json(&self.latest_snapshot_path())
    }

    pub fn read_previous_snapshot(&self) -> Result<Option<CrawlSnapshot>> {
        read_json(&self.previous_snapshot_path())
    }

    /// Read the latest snapshot, failing if no crawl has been run yet.
    pub fn require_latest_snapshot(&self) -> Result<CrawlSnapshot> {
        let path = self.latest_snapshot_path();
        self.read_latest_snapshot()?.ok_or_else(|| {
            KbError::missing_input(
                "latest crawl snapshot",
                path,
                "Run `azui-kb crawl` first.",
            )
        })
    }

    /// Rotate the current latest snapshot (if any) to previous, then write
    /// `snapshot` as the new latest. History is one generation deep.
    pub fn rotate_and_write_snapshot(&self, snapshot: &CrawlSnapshot) -> Result<()> {
        let latest = self.latest_snapshot_path();
        let previous = self.previous_snapshot_path();

        if latest.exists() {
            copy_atomic(&latest, &previous)?;
            debug!(from = %latest.display(), to = %previous.display(), "rotated snapshot");
        }

        write_json(&latest, snapshot)?;
        info!(path = %latest.display(), pages = snapshot.page_count, "wrote crawl snapshot");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Diff
    // -----------------------------------------------------------------------

    pub fn write_diff(&self, diff: &DiffResult) -> Result<()> {
        write_json(&self.diff_path(), diff)
    }

    /// Read the diff result, failing if the differ has not been run.
    pub fn require_diff(&self) -> Result<DiffResult> {
        let path = self.diff_path();
        read_json(&path)?.ok_or_else(|| {
            KbError::missing_input("diff result", path, "Run `azui-kb diff` first.")
        })
    }

    // -----------------------------------------------------------------------
    // Catalog
    // -----------------------------------------------------------------------

    pub fn read_catalog(&self) -> Result<Option<ArticleCatalog>> {
        read_json(&self.catalog_path())
    }

    pub fn write_catalog(&self, catalog: &ArticleCatalog) -> Result<()> {
        write_json(&self.catalog_path(), catalog)
    }

    // -----------------------------------------------------------------------
    // Reports
    // -----------------------------------------------------------------------

    /// Write a report to `kb-update-<timestamp>.md` and to `latest.md`.
    /// Returns the timestamped path.
    pub fn write_report(&self, generated_at: DateTime<Utc>, body: &str) -> Result<PathBuf> {
        let dir = self.reports_dir();
        let path = dir.join(report_file_name(generated_at));
        write_atomic(&path, body.as_bytes())?;
        write_atomic(&dir.join(REPORT_LATEST), body.as_bytes())?;
        Ok(path)
    }
}

/// `kb-update-2026-10-19T08-30-00-123Z.md`
pub fn report_file_name(generated_at: DateTime<Utc>) -> String {
    format!(
        "kb-update-{}.md",
        generated_at.format("%Y-%m-%dT%H-%M-%S-%3fZ")
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read a JSON file. `Ok(None)` when the file does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|e| KbError::io(path, e))?;
    let value = serde_json::from_str(&content).map_err(|e| {
        KbError::validation(format!("invalid {}: {e}", path.display()))
    })?;
    Ok(Some(value))
}

/// Write a JSON file (pretty-printed, trailing newline).
fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(data).map_err(|e| {
        KbError::validation(format!("JSON serialization failed: {e}"))
    })?;
    json.push('\n');
    write_atomic(path, json.as_bytes())?;
    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}

/// Write to a sibling temp file, then rename over `path`.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| KbError::io(parent, e))?;

    let temp = temp_sibling(path);
    std::fs::write(&temp, content).map_err(|e| KbError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| KbError::io(path, e))?;
    Ok(())
}

fn copy_atomic(from: &Path, to: &Path) -> Result<()> {
    let temp = temp_sibling(to);
    std::fs::copy(from, &temp).map_err(|e| KbError::io(from, e))?;
    std::fs::rename(&temp, to).map_err(|e| KbError::io(to, e))?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}
