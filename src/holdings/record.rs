// src/holdings/record.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

use super::roles::ColumnRoles;
use crate::table::{Cell, Row};

/// One holding as read from a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub code: Option<String>,
    pub name: Option<String>,
    /// Portfolio weight in percent.
    pub weight: Option<f64>,
    pub shares: Option<i64>,
}

/// Holdings of one snapshot, addressed by key.
pub type RecordIndex = BTreeMap<String, Record>;

/// Strip the decorations providers put around numbers: whitespace, thousands
/// separators and a percent sign. `None` when nothing is left.
fn strip_numeric(raw: &str) -> Option<String> {
    let s = raw.trim().replace(',', "").replace('%', "");
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Tolerant float coercion. Anything unparsable is simply absent.
pub fn to_float(cell: Option<&Cell>) -> Option<f64> {
    let v = match cell? {
        Cell::Number(n) => *n,
        Cell::Text(s) => strip_numeric(s)?.parse::<f64>().ok()?,
    };
    v.is_finite().then_some(v)
}

/// Tolerant integer coercion: parse as a float, then truncate toward zero.
pub fn to_int(cell: Option<&Cell>) -> Option<i64> {
    let v = to_float(cell)?.trunc();
    if v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// Trimmed text of a cell; blank counts as absent.
fn to_text(cell: Option<&Cell>) -> Option<String> {
    let s = cell?.to_string();
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn lookup<'a>(row: &'a Row, column: Option<&str>) -> Option<&'a Cell> {
    row.get(column?)?.as_ref()
}

/// Read one row through the resolved roles. Rows with neither a code nor a name are unaddressable.
pub fn build_record(row: &Row, roles: &ColumnRoles) -> Option<Record> {
    let code = to_text(lookup(row, roles.code.as_deref()));
    let name = to_text(lookup(row, roles.name.as_deref()));
    let key = code.clone().or_else(|| name.clone())?;

    Some(Record {
        key,
        code,
        name,
        weight: to_float(lookup(row, roles.weight.as_deref())),
        shares: to_int(lookup(row, roles.shares.as_deref())),
    })
}

/// Index a snapshot's rows by key. A later row with the same key replaces the earlier one.
pub fn build_index(rows: &[Row], roles: &ColumnRoles) -> RecordIndex {
    let mut index = RecordIndex::new();
    let mut skipped = 0usize;
    for row in rows {
        match build_record(row, roles) {
            Some(rec) => {
                if let Some(prev) = index.insert(rec.key.clone(), rec) {
                    trace!(key = %prev.key, "duplicate key, keeping the later row");
                }
            }
            None => skipped += 1,
        }
    }
    debug!(records = index.len(), skipped, "built record index");
    index
}
