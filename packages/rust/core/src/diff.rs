//! Snapshot differ: URL-keyed set comparison using the content hash as the change oracle.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use azui_kb_shared::{DiffCounts, DiffResult, PageRecord};

/// Partition `latest` against `previous` into added/changed/unchanged/removed.
///
/// Lists keep snapshot order: latest order for the first three, previous
/// order for `removed`. A URL repeated within a snapshot is classified once.
pub fn diff_pages(
    latest: &[PageRecord],
    previous: &[PageRecord],
    generated_at: DateTime<Utc>,
) -> DiffResult {
    let prev_by_url: HashMap<&str, &str> = previous
        .iter()
        .map(|p| (p.url.as_str(), p.hash.as_str()))
        .collect();
    let latest_urls: HashSet<&str> = latest.iter().map(|p| p.url.as_str()).collect();

    let mut added = Vec::new();
    let mut changed = Vec::new();
    let mut unchanged = Vec::new();
    let mut removed = Vec::new();

    let mut seen = HashSet::new();
    for page in latest {
        if !seen.insert(page.url.as_str()) {
            continue;
        }
        match prev_by_url.get(page.url.as_str()) {
            None => added.push(page.url.clone()),
            Some(&old_hash) if old_hash != page.hash => changed.push(page.url.clone()),
            Some(_) => unchanged.push(page.url.clone()),
        }
    }

    let mut seen = HashSet::new();
    for page in previous {
        if !latest_urls.contains(page.url.as_str()) && seen.insert(page.url.as_str()) {
            removed.push(page.url.clone());
        }
    }

    let counts = DiffCounts {
        added: added.len(),
        removed: removed.len(),
        changed: changed.len(),
        unchanged: unchanged.len(),
    };

    DiffResult {
        generated_at,
        added,
        removed,
        changed,
        unchanged,
        counts,
    }
}
