//! Pipeline logic for the knowledge base: snapshot diffing, catalog
//! reconciliation, report rendering, and the stage runners that tie them to
//! the on-disk store.

pub mod diff;
pub mod pipeline;
pub mod report;
pub mod update;

pub use diff::diff_pages;
pub use pipeline::{
    PipelineProgress, Stage, StageOutcome, run_all, run_crawl, run_diff, run_report, run_update,
};
pub use report::render_report;
pub use update::{build_catalog, infer_topic, make_id, to_summary};
