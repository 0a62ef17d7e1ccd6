// src/history/snapshot.rs

use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::diff::{ChangeReport, ChangeSummary, CHANGE_COLUMNS};
use crate::table::NormalizedTable;

/// Providers publish on Taipei time (UTC+8, no DST).
const MARKET_UTC_OFFSET_SECS: i32 = 8 * 3600;

const PLACEHOLDER_COLUMN: &str = "提示";
const PLACEHOLDER_MESSAGE: &str = "尚無變動資料（需要至少兩天快照）";

pub fn market_offset() -> FixedOffset {
    FixedOffset::east_opt(MARKET_UTC_OFFSET_SECS).expect("UTC+8 is a valid offset")
}

/// Wall-clock time in the market timezone.
pub fn market_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&market_offset())
}

/// The calendar date a snapshot is filed under: the provider's data date when
/// it parses, otherwise the fetch day in market time.
pub fn resolve_snapshot_date(data_date: Option<&str>, fetched_at: DateTime<FixedOffset>) -> NaiveDate {
    if let Some(raw) = data_date {
        match NaiveDate::parse_from_str(&raw.replace('-', "/"), "%Y/%m/%d") {
            Ok(d) => return d,
            Err(e) => warn!(data_date = raw, error = %e, "unusable data date, using fetch date"),
        }
    }
    fetched_at.date_naive()
}

/// One source's holdings as observed on one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub code: String,
    pub source_url: String,
    /// Date printed on the provider page (`YYYY/MM/DD`), if any.
    pub data_date: Option<String>,
    pub snapshot_date: NaiveDate,
    pub scraped_at: DateTime<FixedOffset>,
    #[serde(flatten)]
    pub table: NormalizedTable,
}

impl Snapshot {
    pub fn new(
        code: impl Into<String>,
        source_url: impl Into<String>,
        data_date: Option<String>,
        scraped_at: DateTime<FixedOffset>,
        table: NormalizedTable,
    ) -> Self {
        let snapshot_date = resolve_snapshot_date(data_date.as_deref(), scraped_at);
        Self {
            code: code.into(),
            source_url: source_url.into(),
            data_date,
            snapshot_date,
            scraped_at,
            table,
        }
    }
}

/// The `changes/<code>.json` document: a real report, or a placeholder while
/// a source has fewer than two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangesDocument {
    pub base_date: NaiveDate,
    pub compare_date: Option<NaiveDate>,
    pub summary: ChangeSummary,
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Value>,
}

impl ChangesDocument {
    pub fn from_report(report: &ChangeReport) -> Result<Self> {
        let rows = report
            .rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            base_date: report.base_date,
            compare_date: Some(report.compare_date),
            summary: report.summary,
            columns: CHANGE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        })
    }

    pub fn placeholder(base_date: NaiveDate) -> Self {
        Self {
            base_date,
            compare_date: None,
            summary: ChangeSummary::default(),
            columns: vec![PLACEHOLDER_COLUMN.to_string()],
            rows: vec![serde_json::Value::Object(
                [(
                    PLACEHOLDER_COLUMN.to_string(),
                    serde_json::Value::from(PLACEHOLDER_MESSAGE),
                )]
                .into_iter()
                .collect(),
            )],
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.compare_date.is_none()
    }
}

/// The `current/index.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceIndex {
    pub codes: Vec<String>,
    pub generated_at: DateTime<FixedOffset>,
}
