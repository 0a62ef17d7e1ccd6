// src/pipeline.rs

use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::{stream, StreamExt};
use reqwest::Client;
use std::time::Instant;
use tracing::{error, info, instrument};

use crate::config::{self, Settings, SourceConfig};
use crate::diff::{compare_snapshots, ChangeSummary};
use crate::fetch::{self, browser::RenderOptions};
use crate::history::{market_now, ChangesDocument, Snapshot, SnapshotStore};

/// What one successful source cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOutcome {
    pub code: String,
    pub snapshot_date: NaiveDate,
    pub rows: usize,
    /// `None` while the source has fewer than two snapshots.
    pub summary: Option<ChangeSummary>,
}

/// Result of a full run over every configured source.
#[derive(Debug, Default)]
pub struct RunReport {
    pub succeeded: Vec<SourceOutcome>,
    /// `(code, error)` for each source whose cycle failed.
    pub failed: Vec<(String, String)>,
}

/// Recompute `changes/<code>.json` from the two newest snapshots, or write the
/// placeholder when there aren't two yet.
pub fn refresh_changes(
    store: &SnapshotStore,
    code: &str,
    base_date: NaiveDate,
) -> Result<ChangesDocument> {
    let doc = match store.latest_pair(code)? {
        Some((prev, curr)) => {
            let report = compare_snapshots(&prev, &curr);
            info!(
                source = code,
                base = %report.base_date,
                compare = %report.compare_date,
                added = report.summary.added,
                removed = report.summary.removed,
                changed = report.summary.changed,
                "computed changes"
            );
            ChangesDocument::from_report(&report)?
        }
        None => {
            info!(source = code, "fewer than two snapshots, writing placeholder");
            ChangesDocument::placeholder(base_date)
        }
    };
    store.write_changes(code, &doc)?;
    Ok(doc)
}

/// Persist a freshly built snapshot as both `current` and the dated copy,
/// then refresh the change report.
pub fn record_snapshot(store: &SnapshotStore, snapshot: &Snapshot) -> Result<ChangesDocument> {
    store.write_current(snapshot)?;
    store.write_snapshot(snapshot)?;
    refresh_changes(store, &snapshot.code, snapshot.snapshot_date)
}

/// Fetch → normalize → store → diff, for one source.
#[instrument(level = "info", skip_all, fields(source = %code))]
pub async fn run_source(
    client: &Client,
    render: &RenderOptions,
    store: &SnapshotStore,
    code: &str,
    source: &SourceConfig,
) -> Result<SourceOutcome> {
    let start = Instant::now();
    let fetched = fetch::fetch_holdings(client, render, source)
        .await
        .with_context(|| format!("fetching holdings for {}", code))?;

    let snapshot = Snapshot::new(
        code,
        source.url.as_str(),
        fetched.data_date,
        market_now(),
        fetched.table,
    );
    let doc = record_snapshot(store, &snapshot)?;

    let outcome = SourceOutcome {
        code: code.to_string(),
        snapshot_date: snapshot.snapshot_date,
        rows: snapshot.table.row_count(),
        summary: (!doc.is_placeholder()).then_some(doc.summary),
    };
    info!(
        date = %outcome.snapshot_date,
        rows = outcome.rows,
        elapsed = ?start.elapsed(),
        "source done"
    );
    Ok(outcome)
}

/// Run every configured source. One source failing never stops the others,
/// and the index is written regardless.
pub async fn run_all(settings: &Settings) -> Result<RunReport> {
    let sources = config::load_sources(&settings.sources_path)?;
    let store = SnapshotStore::new(&settings.root)?;
    let client = fetch::build_client()?;
    let render = RenderOptions {
        executable: settings.chrome_path.clone(),
        ..RenderOptions::default()
    };
    info!(
        sources = sources.len(),
        root = %settings.root.display(),
        concurrency = settings.concurrency,
        "starting run"
    );

    let results: Vec<(String, Result<SourceOutcome>)> = stream::iter(sources.iter())
        .map(|(code, source)| {
            let client = &client;
            let render = &render;
            let store = &store;
            async move {
                (
                    code.clone(),
                    run_source(client, render, store, code, source).await,
                )
            }
        })
        .buffer_unordered(settings.concurrency.max(1))
        .collect()
        .await;

    let mut report = RunReport::default();
    for (code, result) in results {
        match result {
            Ok(outcome) => report.succeeded.push(outcome),
            Err(e) => {
                error!(source = %code, error = ?e, "source failed");
                report.failed.push((code, format!("{:#}", e)));
            }
        }
    }
    report.succeeded.sort_by(|a, b| a.code.cmp(&b.code));
    report.failed.sort();

    store.write_index(sources.keys().cloned())?;
    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "run finished"
    );
    Ok(report)
}
