// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, env, fs, path::PathBuf, str::FromStr};
use tracing::warn;

use crate::error::HoldingsError;

pub const DEFAULT_ROOT: &str = "docs/data";
pub const DEFAULT_SOURCES: &str = "scripts/sources.json";
pub const DEFAULT_CONCURRENCY: usize = 3;

fn default_source_type() -> String {
    "playwright_html".to_string()
}

/// How a source publishes its holdings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A page that renders its table client-side.
    RenderedHtml,
    /// A page that ships the table in the served HTML.
    Html,
    /// A CSV download.
    Csv,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::RenderedHtml => "playwright_html",
            SourceKind::Html => "html",
            SourceKind::Csv => "csv",
        }
    }
}

impl FromStr for SourceKind {
    type Err = HoldingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "playwright_html" => Ok(SourceKind::RenderedHtml),
            "html" => Ok(SourceKind::Html),
            "csv" => Ok(SourceKind::Csv),
            _ => Err(HoldingsError::UnknownSourceType(s.to_string())),
        }
    }
}

/// One entry of the sources file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Kept as text so a typo only fails its own source, not the whole file.
    #[serde(rename = "type", default = "default_source_type")]
    pub source_type: String,
    pub url: String,
}

impl SourceConfig {
    pub fn kind(&self) -> Result<SourceKind, HoldingsError> {
        self.source_type.parse()
    }
}

/// Source code → config, in code order.
pub type Sources = BTreeMap<String, SourceConfig>;

pub fn load_sources(path: impl AsRef<std::path::Path>) -> Result<Sources> {
    let path = path.as_ref();
    let text =
        fs::read_to_string(path).with_context(|| format!("reading sources {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing sources {}", path.display()))
}

/// Runtime settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Output root holding `current/`, `snapshots/` and `changes/`.
    pub root: PathBuf,
    pub sources_path: PathBuf,
    /// Sources fetched at the same time.
    pub concurrency: usize,
    /// Chromium used for `playwright_html` sources; looked up when unset.
    pub chrome_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            sources_path: PathBuf::from(DEFAULT_SOURCES),
            concurrency: DEFAULT_CONCURRENCY,
            chrome_path: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Settings::default();
        if let Some(root) = lookup("HOLDSCRAPER_ROOT") {
            settings.root = PathBuf::from(root);
        }
        if let Some(sources) = lookup("HOLDSCRAPER_SOURCES") {
            settings.sources_path = PathBuf::from(sources);
        }
        if let Some(raw) = lookup("HOLDSCRAPER_CONCURRENCY") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => settings.concurrency = n,
                _ => warn!(value = %raw, "ignoring invalid HOLDSCRAPER_CONCURRENCY"),
            }
        }
        if let Some(chrome) = lookup("HOLDSCRAPER_CHROME") {
            settings.chrome_path = Some(PathBuf::from(chrome));
        }
        settings
    }
}
