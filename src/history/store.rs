// src/history/store.rs

use anyhow::{Context, Result};
use glob::{glob, Pattern};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use super::snapshot::{market_now, ChangesDocument, Snapshot, SourceIndex};

const CURRENT_DIR: &str = "current";
const CHANGES_DIR: &str = "changes";
const SNAPSHOTS_DIR: &str = "snapshots";
const INDEX_FILE: &str = "index.json";

/// On-disk home of every source's snapshots and derived documents.
///
/// ```text
/// <root>/current/<code>.json
/// <root>/current/index.json
/// <root>/snapshots/<code>/<YYYY-MM-DD>.json
/// <root>/changes/<code>.json
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

/// Write pretty JSON via a temp file + rename so readers never see a partial document.
fn save_json<T: Serialize>(path: &Path, payload: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    {
        let file =
            File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, payload)
            .with_context(|| format!("serializing {}", path.display()))?;
        w.flush()?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("renaming {} → {}", tmp.display(), path.display()))?;
    debug!(path = %path.display(), "wrote json");
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))
}

impl SnapshotStore {
    /// Open a store at `root`, creating the top-level directories if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for d in [CURRENT_DIR, CHANGES_DIR, SNAPSHOTS_DIR] {
            let dir = root.join(d);
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating store directory {}", dir.display()))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current_path(&self, code: &str) -> PathBuf {
        self.root.join(CURRENT_DIR).join(format!("{}.json", code))
    }

    pub fn snapshot_path(&self, snapshot: &Snapshot) -> PathBuf {
        self.root
            .join(SNAPSHOTS_DIR)
            .join(&snapshot.code)
            .join(format!("{}.json", snapshot.snapshot_date.format("%Y-%m-%d")))
    }

    pub fn changes_path(&self, code: &str) -> PathBuf {
        self.root.join(CHANGES_DIR).join(format!("{}.json", code))
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(CURRENT_DIR).join(INDEX_FILE)
    }

    /// Replace `current/<code>.json`.
    pub fn write_current(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        let path = self.current_path(&snapshot.code);
        save_json(&path, snapshot)?;
        Ok(path)
    }

    /// File the snapshot under its calendar date. A same-day re-run overwrites.
    pub fn write_snapshot(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        let path = self.snapshot_path(snapshot);
        if path.exists() {
            info!(path = %path.display(), "overwriting same-day snapshot");
        }
        save_json(&path, snapshot)?;
        Ok(path)
    }

    /// All snapshot files for `code`, oldest first (filenames sort by date).
    pub fn list_snapshots(&self, code: &str) -> Result<Vec<PathBuf>> {
        let dir = self.root.join(SNAPSHOTS_DIR).join(code);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let pattern = format!("{}/*.json", Pattern::escape(&dir.to_string_lossy()));
        let mut files: Vec<PathBuf> = glob(&pattern)
            .with_context(|| format!("bad glob pattern {}", pattern))?
            .filter_map(Result::ok)
            .collect();
        files.sort();
        Ok(files)
    }

    pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
        load_json(path)
    }

    /// The two most recent snapshots as `(previous, current)`, if two exist.
    pub fn latest_pair(&self, code: &str) -> Result<Option<(Snapshot, Snapshot)>> {
        let files = self.list_snapshots(code)?;
        match files.as_slice() {
            [.., prev, curr] => Ok(Some((
                Self::load_snapshot(prev)?,
                Self::load_snapshot(curr)?,
            ))),
            _ => Ok(None),
        }
    }

    pub fn write_changes(&self, code: &str, doc: &ChangesDocument) -> Result<PathBuf> {
        let path = self.changes_path(code);
        save_json(&path, doc)?;
        Ok(path)
    }

    /// Write `current/index.json` listing every configured source code.
    pub fn write_index<I, S>(&self, codes: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut codes: Vec<String> = codes.into_iter().map(Into::into).collect();
        codes.sort();
        let idx = SourceIndex {
            codes,
            generated_at: market_now(),
        };
        let path = self.index_path();
        save_json(&path, &idx)?;
        Ok(path)
    }
}
