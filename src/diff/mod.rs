// src/diff/mod.rs

//! Day-over-day comparison of two record indexes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::history::Snapshot;
use crate::holdings::{build_index, detect_columns, Record, RecordIndex};

/// Weight moves at or below this are float noise, not a change.
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// Column labels of a persisted change report, in display order.
pub const CHANGE_COLUMNS: [&str; 9] = [
    "狀態",
    "代號",
    "名稱",
    "權重_今日(%)",
    "權重_前日(%)",
    "權重差(%)",
    "股數_今日",
    "股數_前日",
    "股數差",
];

/// Classification of one key. Declaration order is the report's sort order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ChangeStatus {
    #[serde(rename = "新增")]
    Added,
    #[serde(rename = "移除")]
    Removed,
    #[serde(rename = "變動")]
    Changed,
    #[serde(rename = "不變")]
    Unchanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub unchanged: usize,
}

impl ChangeSummary {
    fn count(&mut self, status: ChangeStatus) {
        match status {
            ChangeStatus::Added => self.added += 1,
            ChangeStatus::Removed => self.removed += 1,
            ChangeStatus::Changed => self.changed += 1,
            ChangeStatus::Unchanged => self.unchanged += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.added + self.removed + self.changed + self.unchanged
    }
}

/// One line of the report. Serialized with the localized column labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRow {
    #[serde(rename = "狀態")]
    pub status: ChangeStatus,
    #[serde(rename = "代號")]
    pub code: Option<String>,
    #[serde(rename = "名稱")]
    pub name: Option<String>,
    #[serde(rename = "權重_今日(%)")]
    pub weight_current: Option<f64>,
    #[serde(rename = "權重_前日(%)")]
    pub weight_previous: Option<f64>,
    #[serde(rename = "權重差(%)")]
    pub weight_delta: Option<f64>,
    #[serde(rename = "股數_今日")]
    pub shares_current: Option<i64>,
    #[serde(rename = "股數_前日")]
    pub shares_previous: Option<i64>,
    #[serde(rename = "股數差")]
    pub shares_delta: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeReport {
    /// Date of the current snapshot.
    pub base_date: NaiveDate,
    /// Date of the previous snapshot.
    pub compare_date: NaiveDate,
    pub summary: ChangeSummary,
    pub rows: Vec<ChangeRow>,
}

/// Decimal places a weight delta is rounded to before it is compared or reported.
const WEIGHT_DELTA_DECIMALS: i32 = 12;

/// `current − previous`, missing sides counting as zero; `None` if both are missing.
///
/// Rounded so subtraction noise (`5.000000002 − 5.000000001` is not exactly
/// `1e-9`) never pushes a move across `WEIGHT_EPSILON`.
fn weight_delta(previous: Option<f64>, current: Option<f64>) -> Option<f64> {
    if previous.is_none() && current.is_none() {
        return None;
    }
    let raw = current.unwrap_or(0.0) - previous.unwrap_or(0.0);
    let scale = 10f64.powi(WEIGHT_DELTA_DECIMALS);
    Some((raw * scale).round() / scale)
}

fn shares_delta(previous: Option<i64>, current: Option<i64>) -> Option<i64> {
    if previous.is_none() && current.is_none() {
        return None;
    }
    Some(current.unwrap_or(0).saturating_sub(previous.unwrap_or(0)))
}

fn classify(previous: Option<&Record>, current: Option<&Record>) -> ChangeStatus {
    match (previous, current) {
        (None, _) => ChangeStatus::Added,
        (Some(_), None) => ChangeStatus::Removed,
        (Some(p), Some(c)) => {
            let dw = weight_delta(p.weight, c.weight);
            let ds = shares_delta(p.shares, c.shares);
            if dw.map_or(false, |d| d.abs() > WEIGHT_EPSILON) || ds.map_or(false, |d| d != 0) {
                ChangeStatus::Changed
            } else {
                ChangeStatus::Unchanged
            }
        }
    }
}

fn change_row(status: ChangeStatus, previous: Option<&Record>, current: Option<&Record>) -> ChangeRow {
    let pick = |f: fn(&Record) -> Option<&String>| {
        current
            .and_then(f)
            .or_else(|| previous.and_then(f))
            .cloned()
    };
    let weight_current = current.and_then(|r| r.weight);
    let weight_previous = previous.and_then(|r| r.weight);
    let shares_current = current.and_then(|r| r.shares);
    let shares_previous = previous.and_then(|r| r.shares);

    ChangeRow {
        status,
        code: pick(|r| r.code.as_ref()),
        name: pick(|r| r.name.as_ref()),
        weight_current,
        weight_previous,
        weight_delta: weight_delta(weight_previous, weight_current),
        shares_current,
        shares_previous,
        shares_delta: shares_delta(shares_previous, shares_current),
    }
}

/// Compare two dated indexes and produce an ordered, classified report.
///
/// Pure: the same two indexes always give the same report.
pub fn diff_indexes(
    previous: &RecordIndex,
    previous_date: NaiveDate,
    current: &RecordIndex,
    current_date: NaiveDate,
) -> ChangeReport {
    let keys: BTreeSet<&String> = previous.keys().chain(current.keys()).collect();

    let mut summary = ChangeSummary::default();
    let mut rows = Vec::with_capacity(keys.len());
    for key in keys {
        let p = previous.get(key);
        let c = current.get(key);
        let status = classify(p, c);
        summary.count(status);
        rows.push(change_row(status, p, c));
    }

    rows.sort_by(|a, b| {
        a.status
            .cmp(&b.status)
            .then_with(|| a.code.as_deref().unwrap_or("").cmp(b.code.as_deref().unwrap_or("")))
            .then_with(|| a.name.as_deref().unwrap_or("").cmp(b.name.as_deref().unwrap_or("")))
    });

    debug!(
        added = summary.added,
        removed = summary.removed,
        changed = summary.changed,
        unchanged = summary.unchanged,
        "diffed holdings"
    );

    ChangeReport {
        base_date: current_date,
        compare_date: previous_date,
        summary,
        rows,
    }
}

/// Detect roles, index, and diff two stored snapshots.
pub fn compare_snapshots(previous: &Snapshot, current: &Snapshot) -> ChangeReport {
    let prev_roles = detect_columns(&previous.table.columns);
    let curr_roles = detect_columns(&current.table.columns);
    let prev_index = build_index(&previous.table.rows, &prev_roles);
    let curr_index = build_index(&current.table.rows, &curr_roles);
    diff_indexes(
        &prev_index,
        previous.snapshot_date,
        &curr_index,
        current.snapshot_date,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(code: &str, name: &str, weight: Option<f64>, shares: Option<i64>) -> Record {
        Record {
            key: code.to_string(),
            code: Some(code.to_string()),
            name: Some(name.to_string()),
            weight,
            shares,
        }
    }

    fn index(records: Vec<Record>) -> RecordIndex {
        records.into_iter().map(|r| (r.key.clone(), r)).collect()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_added_and_unchanged() {
        let prev = index(vec![rec("2330", "TSMC", Some(10.0), Some(1000))]);
        let curr = index(vec![
            rec("2330", "TSMC", Some(10.0), Some(1000)),
            rec("2317", "Foxconn", Some(2.0), Some(500)),
        ]);
        let report = diff_indexes(&prev, day(16), &curr, day(17));

        assert_eq!(
            report.summary,
            ChangeSummary {
                added: 1,
                removed: 0,
                changed: 0,
                unchanged: 1
            }
        );
        assert_eq!(report.base_date, day(17));
        assert_eq!(report.compare_date, day(16));

        let added = &report.rows[0];
        assert_eq!(added.status, ChangeStatus::Added);
        assert_eq!(added.code.as_deref(), Some("2317"));
        assert_eq!(added.weight_previous, None);
        assert_eq!(added.shares_previous, None);
        assert_eq!(added.weight_delta, Some(2.0));
        assert_eq!(added.shares_delta, Some(500));

        let same = &report.rows[1];
        assert_eq!(same.status, ChangeStatus::Unchanged);
        assert_eq!(same.weight_delta, Some(0.0));
        assert_eq!(same.shares_delta, Some(0));
    }

    #[test]
    fn test_weight_epsilon() {
        let prev = index(vec![rec("A", "a", Some(5.000000001), None)]);
        let curr = index(vec![rec("A", "a", Some(5.000000002), None)]);
        let report = diff_indexes(&prev, day(1), &curr, day(2));
        assert_eq!(report.rows[0].status, ChangeStatus::Unchanged);
        assert_eq!(report.rows[0].shares_delta, None);

        let prev = index(vec![rec("A", "a", Some(5.0), None)]);
        let curr = index(vec![rec("A", "a", Some(5.01), None)]);
        let report = diff_indexes(&prev, day(1), &curr, day(2));
        assert_eq!(report.rows[0].status, ChangeStatus::Changed);
    }

    #[test]
    fn test_weight_delta_rounding() {
        // raw subtraction gives 1.000000082740371e-9
        let d = weight_delta(Some(5.000000001), Some(5.000000002)).unwrap();
        assert_eq!(d, 1e-9);
        assert!(d.abs() <= WEIGHT_EPSILON);

        let d = weight_delta(Some(5.0), Some(5.01)).unwrap();
        assert_eq!(d, 0.01);
        assert_eq!(weight_delta(None, Some(2.5)), Some(2.5));
        assert_eq!(weight_delta(None, None), None);

        let prev = index(vec![rec("A", "a", Some(5.000000001), None)]);
        let curr = index(vec![rec("A", "a", Some(5.000000002), None)]);
        let report = diff_indexes(&prev, day(1), &curr, day(2));
        assert_eq!(report.rows[0].weight_delta, Some(1e-9));
        assert_eq!(report.summary.unchanged, 1);
    }

    #[test]
    fn test_shares_only_change() {
        let prev = index(vec![rec("A", "a", None, Some(100))]);
        let curr = index(vec![rec("A", "a", None, Some(99))]);
        let report = diff_indexes(&prev, day(1), &curr, day(2));
        assert_eq!(report.rows[0].status, ChangeStatus::Changed);
        assert_eq!(report.rows[0].shares_delta, Some(-1));
        assert_eq!(report.rows[0].weight_delta, None);
    }

    #[test]
    fn test_weight_appearing_counts_as_change() {
        let prev = index(vec![rec("A", "a", None, None)]);
        let curr = index(vec![rec("A", "a", Some(0.5), None)]);
        let report = diff_indexes(&prev, day(1), &curr, day(2));
        assert_eq!(report.rows[0].status, ChangeStatus::Changed);
        assert_eq!(report.rows[0].weight_delta, Some(0.5));
    }

    #[test]
    fn test_removed_falls_back_to_previous_fields() {
        let prev = index(vec![rec("1101", "台泥", Some(1.0), Some(10))]);
        let curr = RecordIndex::new();
        let report = diff_indexes(&prev, day(1), &curr, day(2));
        let row = &report.rows[0];
        assert_eq!(row.status, ChangeStatus::Removed);
        assert_eq!(row.code.as_deref(), Some("1101"));
        assert_eq!(row.name.as_deref(), Some("台泥"));
        assert_eq!(row.weight_current, None);
        assert_eq!(row.weight_delta, Some(-1.0));
        assert_eq!(row.shares_delta, Some(-10));
    }

    #[test]
    fn test_name_prefers_current_then_previous() {
        let prev = index(vec![rec("A", "old", Some(1.0), None)]);
        let mut renamed = rec("A", "new", Some(1.0), None);
        let curr = index(vec![renamed.clone()]);
        let report = diff_indexes(&prev, day(1), &curr, day(2));
        assert_eq!(report.rows[0].name.as_deref(), Some("new"));

        renamed.name = None;
        let curr = index(vec![renamed]);
        let report = diff_indexes(&prev, day(1), &curr, day(2));
        assert_eq!(report.rows[0].name.as_deref(), Some("old"));
    }

    #[test]
    fn test_ordering_and_coverage() {
        let prev = index(vec![
            rec("3", "c", Some(1.0), None),
            rec("1", "a", Some(1.0), None),
            rec("9", "z", Some(1.0), None),
            rec("5", "e", Some(1.0), None),
        ]);
        let mut cash = rec("現金", "現金", Some(0.1), None);
        cash.code = None;
        let curr = index(vec![
            rec("1", "a", Some(1.0), None),
            rec("3", "c", Some(2.0), None),
            rec("7", "g", Some(1.0), None),
            rec("2", "b", Some(1.0), None),
            cash,
        ]);
        let report = diff_indexes(&prev, day(1), &curr, day(2));

        let order: Vec<(ChangeStatus, Option<&str>)> = report
            .rows
            .iter()
            .map(|r| (r.status, r.code.as_deref()))
            .collect();
        assert_eq!(
            order,
            vec![
                (ChangeStatus::Added, None),
                (ChangeStatus::Added, Some("2")),
                (ChangeStatus::Added, Some("7")),
                (ChangeStatus::Removed, Some("5")),
                (ChangeStatus::Removed, Some("9")),
                (ChangeStatus::Changed, Some("3")),
                (ChangeStatus::Unchanged, Some("1")),
            ]
        );

        let union: BTreeSet<&String> = prev.keys().chain(curr.keys()).collect();
        assert_eq!(report.rows.len(), union.len());
        assert_eq!(report.summary.total(), union.len());
    }

    #[test]
    fn test_idempotent() {
        let prev = index(vec![
            rec("1", "a", Some(1.0), Some(1)),
            rec("2", "b", Some(2.0), Some(2)),
        ]);
        let curr = index(vec![
            rec("2", "b", Some(2.5), Some(2)),
            rec("3", "c", Some(3.0), Some(3)),
        ]);
        assert_eq!(
            diff_indexes(&prev, day(1), &curr, day(2)),
            diff_indexes(&prev, day(1), &curr, day(2))
        );
    }

    #[test]
    fn test_row_serializes_with_labels() {
        let prev = RecordIndex::new();
        let curr = index(vec![rec("2330", "台積電", Some(10.0), None)]);
        let report = diff_indexes(&prev, day(1), &curr, day(2));
        let json = serde_json::to_value(&report.rows[0]).unwrap();
        assert_eq!(json["狀態"], "新增");
        assert_eq!(json["代號"], "2330");
        assert_eq!(json["權重_今日(%)"], 10.0);
        assert!(json["股數差"].is_null());
        let labels: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(labels.len(), CHANGE_COLUMNS.len());
    }
}
