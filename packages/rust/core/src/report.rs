//! Markdown change report rendered from a diff result.

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};

use azui_kb_shared::DiffResult;

/// Render the human-readable update report.
///
/// `entry_count` is the size of the current catalog (zero when none exists).
pub fn render_report(diff: &DiffResult, entry_count: usize, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str("# KB Update Report\n\n");
    let _ = writeln!(
        out,
        "- Generated: {}",
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    let _ = writeln!(out, "- Entries: {entry_count}");
    let _ = writeln!(out, "- Added: {}", diff.counts.added);
    let _ = writeln!(out, "- Changed: {}", diff.counts.changed);
    let _ = writeln!(out, "- Removed: {}", diff.counts.removed);

    url_section(&mut out, "Added URLs", &diff.added);
    url_section(&mut out, "Changed URLs", &diff.changed);
    url_section(&mut out, "Removed URLs", &diff.removed);
    out
}

fn url_section(out: &mut String, heading: &str, urls: &[String]) {
    let _ = write!(out, "\n## {heading}\n");
    if urls.is_empty() {
        out.push_str("- None\n");
    }
    for url in urls {
        let _ = writeln!(out, "- {url}");
    }
}
