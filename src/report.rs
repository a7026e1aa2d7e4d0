//! Terminal summaries with stable column widths, one line per collection
//! plus a totals row. Emitted under the `report` log target.

use itertools::Itertools;
use tracing::info;

use crate::checker::CheckResult;
use crate::local::playlist::LocalSyncResult;
use crate::remote::playlist::SyncResult;
use crate::searcher::SearchResult;
use crate::util::{align_and_truncate, max_width};

pub fn log_search_results(results: &[(String, SearchResult)]) {
    if results.is_empty() {
        return;
    }
    let width = max_width(results.iter().map(|(name, _)| name.as_str()));

    let (mut matched, mut unmatched, mut skipped) = (0, 0, 0);
    for (name, result) in results {
        matched += result.matched.len();
        unmatched += result.unmatched.len();
        skipped += result.skipped.len();
        let total = result.matched.len() + result.unmatched.len() + result.skipped.len();
        info!(
            target: "report",
            "{} | {:>6} matched | {:>6} unmatched | {:>6} skipped | {:>6} total",
            align_and_truncate(name, width),
            result.matched.len(),
            result.unmatched.len(),
            result.skipped.len(),
            total,
        );
    }
    info!(
        target: "report",
        "{} | {:>6} matched | {:>6} unmatched | {:>6} skipped | {:>6} total",
        align_and_truncate("TOTALS", width),
        matched,
        unmatched,
        skipped,
        matched + unmatched + skipped,
    );
}

pub fn log_check_result(result: &CheckResult) {
    info!(
        target: "report",
        "CHECK TOTALS | {:>5} switched | {:>5} unavailable | {:>5} unchanged",
        result.switched.len(),
        result.unavailable.len(),
        result.unchanged.len(),
    );
}

pub fn log_sync_results(results: &[(String, SyncResult)]) {
    if results.is_empty() {
        return;
    }
    let width = max_width(results.iter().map(|(name, _)| name.as_str()));
    for (name, result) in results {
        info!(
            target: "report",
            "{} | {:>6} start | {:>6} added | {:>6} removed | {:>6} unchanged | {:>6} difference | {:>6} final",
            align_and_truncate(name, width),
            result.start,
            result.added,
            result.removed,
            result.unchanged,
            result.difference,
            result.final_count,
        );
    }
}

pub fn log_playlist_saves(results: &[(String, LocalSyncResult)]) {
    if results.is_empty() {
        return;
    }
    let width = max_width(results.iter().map(|(name, _)| name.as_str()));
    for (name, result) in results {
        info!(
            target: "report",
            "{} | {:>6} start | {:>6} added | {:>6} removed | {:>6} unchanged | {:>6} final",
            align_and_truncate(name, width),
            result.start,
            result.added,
            result.removed,
            result.unchanged,
            result.final_count,
        );
    }
}

/// One line per name/count pair, e.g. the library's playlists.
pub fn log_name_counts(header: &str, counts: &[(String, usize)]) {
    if counts.is_empty() {
        return;
    }
    info!(target: "report", "{header}");
    let width = max_width(counts.iter().map(|(name, _)| name.as_str()));
    for (name, count) in counts.iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
        info!(
            target: "report",
            "{} | {:>6} total tracks",
            align_and_truncate(name, width),
            count,
        );
    }
}
