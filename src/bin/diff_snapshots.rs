use anyhow::{Context, Result};
use holdscraper::{diff::compare_snapshots, history::ChangesDocument, history::SnapshotStore};
use std::env;
use std::path::PathBuf;

fn main() -> Result<()> {
    // 1) Two snapshot files: previous, then current
    let mut args = env::args().skip(1);
    let usage = "Usage: diff_snapshots <PREVIOUS_SNAPSHOT.json> <CURRENT_SNAPSHOT.json>";
    let prev_path = PathBuf::from(args.next().context(usage)?);
    let curr_path = PathBuf::from(args.next().context(usage)?);

    // 2) Load + diff
    let prev = SnapshotStore::load_snapshot(&prev_path)?;
    let curr = SnapshotStore::load_snapshot(&curr_path)?;
    let report = compare_snapshots(&prev, &curr);

    // 3) Print the same document the scraper writes to changes/<code>.json
    let doc = ChangesDocument::from_report(&report)?;
    println!("{}", serde_json::to_string_pretty(&doc)?);
    eprintln!(
        "→ {} vs {}: +{} -{} ~{} ={}",
        report.base_date,
        report.compare_date,
        report.summary.added,
        report.summary.removed,
        report.summary.changed,
        report.summary.unchanged
    );
    Ok(())
}
