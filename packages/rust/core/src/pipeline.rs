//! Stage runners: crawl → diff → update → report, individually or in sequence.
//!
//! Each stage reads its inputs from, and writes its outputs to, a [`KbStore`].
//! Stages share no in-memory state; the files are the hand-off.

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};

use azui_kb_crawler::{Crawler, ProgressReporter, SilentProgress};
use azui_kb_shared::{DEFAULT_CATALOG_SCOPE, DiffCounts, EntryStatus, Result};
use azui_kb_storage::KbStore;

use crate::diff::diff_pages;
use crate::report::render_report;
use crate::update::build_catalog;

/// One pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Crawl,
    Diff,
    Update,
    Report,
}

impl Stage {
    /// Fixed execution order used by [`run_all`].
    pub const ALL: [Stage; 4] = [Stage::Crawl, Stage::Diff, Stage::Update, Stage::Report];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Crawl => "Crawling source site",
            Stage::Diff => "Comparing snapshots",
            Stage::Update => "Updating article catalog",
            Stage::Report => "Writing change report",
        }
    }
}

/// What a finished stage produced. `Display` gives the one-line summary.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Crawl { pages: usize },
    Diff(DiffCounts),
    Update { entries: usize, link_only: usize },
    Report { path: PathBuf },
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutcome::Crawl { pages } => write!(f, "KB crawl complete: {pages} pages saved."),
            StageOutcome::Diff(c) => write!(
                f,
                "KB diff complete: +{} / ~{} / -{}",
                c.added, c.changed, c.removed
            ),
            StageOutcome::Update { entries, .. } => {
                write!(f, "KB update complete: {entries} entries written.")
            }
            StageOutcome::Report { path } => write!(f, "KB report written: {}", path.display()),
        }
    }
}

/// Progress callbacks for a multi-stage run. Extends the crawler's per-page
/// reporter so one object can drive both.
pub trait PipelineProgress: ProgressReporter {
    /// Called when a stage starts.
    fn phase(&self, stage: Stage);
    /// Called when a stage finishes successfully.
    fn stage_done(&self, outcome: &StageOutcome);
}

impl PipelineProgress for SilentProgress {
    fn phase(&self, _stage: Stage) {}
    fn stage_done(&self, _outcome: &StageOutcome) {}
}

// ---------------------------------------------------------------------------
// Individual stages
// ---------------------------------------------------------------------------

/// Crawl the configured site, rotate `crawl-latest` to `crawl-previous`,
/// and persist the new snapshot.
#[instrument(skip_all, fields(root = %store.root().display()))]
pub async fn run_crawl(store: &KbStore, progress: &dyn ProgressReporter) -> Result<StageOutcome> {
    let config = store.load_config()?;
    let crawler = Crawler::new(config)?;
    let snapshot = crawler.crawl(progress).await;
    store.rotate_and_write_snapshot(&snapshot)?;
    info!(pages = snapshot.page_count, "snapshot saved");
    Ok(StageOutcome::Crawl {
        pages: snapshot.page_count,
    })
}

/// Compare the latest snapshot against the previous one. A missing previous
/// snapshot means every page is new.
#[instrument(skip_all, fields(root = %store.root().display()))]
pub fn run_diff(store: &KbStore) -> Result<StageOutcome> {
    let latest = store.require_latest_snapshot()?;
    let previous = store
        .read_previous_snapshot()?
        .map(|s| s.pages)
        .unwrap_or_default();

    let diff = diff_pages(&latest.pages, &previous, Utc::now());
    store.write_diff(&diff)?;
    info!(
        added = diff.counts.added,
        changed = diff.counts.changed,
        removed = diff.counts.removed,
        unchanged = diff.counts.unchanged,
        "diff saved"
    );
    Ok(StageOutcome::Diff(diff.counts))
}

/// Rebuild the article catalog from the latest snapshot, preserving curated
/// fields of existing entries.
#[instrument(skip_all, fields(root = %store.root().display()))]
pub fn run_update(store: &KbStore) -> Result<StageOutcome> {
    let snapshot = store.require_latest_snapshot()?;
    let scope = catalog_scope(store);
    let existing = store.read_catalog()?;

    let catalog = build_catalog(&snapshot, existing.as_ref(), &scope, Utc::now());
    store.write_catalog(&catalog)?;

    let link_only = catalog
        .entries
        .iter()
        .filter(|e| e.status == EntryStatus::LinkOnly)
        .count();
    info!(entries = catalog.entry_count, link_only, %scope, "catalog saved");
    Ok(StageOutcome::Update {
        entries: catalog.entry_count,
        link_only,
    })
}

/// Configured catalog scope. The updater only requires the snapshot, so an
/// absent or unusable config falls back to the built-in scope.
fn catalog_scope(store: &KbStore) -> String {
    if !store.config_path().exists() {
        return DEFAULT_CATALOG_SCOPE.to_string();
    }
    match store.load_config() {
        Ok(config) => config.catalog_scope,
        Err(e) => {
            warn!(error = %e, "config unusable, using default catalog scope");
            DEFAULT_CATALOG_SCOPE.to_string()
        }
    }
}

/// Render the markdown report for the latest diff.
#[instrument(skip_all, fields(root = %store.root().display()))]
pub fn run_report(store: &KbStore) -> Result<StageOutcome> {
    let diff = store.require_diff()?;
    let entry_count = store.read_catalog()?.map_or(0, |c| c.entries.len());

    let generated_at = Utc::now();
    let body = render_report(&diff, entry_count, generated_at);
    let path = store.write_report(generated_at, &body)?;
    info!(?path, "report saved");
    Ok(StageOutcome::Report { path })
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Run every stage in order, stopping at the first failure.
#[instrument(skip_all, fields(root = %store.root().display()))]
pub async fn run_all<P: PipelineProgress>(store: &KbStore, progress: &P) -> Result<Vec<StageOutcome>> {
    let start = Instant::now();
    let mut outcomes = Vec::with_capacity(Stage::ALL.len());

    for stage in Stage::ALL {
        progress.phase(stage);
        let outcome = match stage {
            Stage::Crawl => run_crawl(store, progress).await?,
            Stage::Diff => run_diff(store)?,
            Stage::Update => run_update(store)?,
            Stage::Report => run_report(store)?,
        };
        progress.stage_done(&outcome);
        outcomes.push(outcome);
    }

    info!(duration_ms = start.elapsed().as_millis(), "workflow complete");
    Ok(outcomes)
}
