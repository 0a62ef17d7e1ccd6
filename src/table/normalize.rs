// src/table/normalize.rs

use std::collections::HashSet;
use tracing::trace;

use super::{Cell, NormalizedTable, RawTable, Row};

/// Trim whitespace; blank headers get a positional placeholder.
fn clean_header(raw: &str, idx: usize) -> String {
    let trimmed = raw.trim().trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        format!("Unnamed: {}", idx)
    } else {
        trimmed.to_string()
    }
}

/// Make header names unique by suffixing repeats with `.1`, `.2`, …
fn dedup_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut out = Vec::with_capacity(headers.len());
    for name in headers {
        let mut candidate = name.clone();
        let mut n = 1;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{}.{}", name, n);
            n += 1;
        }
        out.push(candidate);
    }
    out
}

/// Placeholder text that spreadsheet and HTML exports use for a missing value.
/// Matched exactly after trimming, except `nan` which matches in any case.
static NULL_SENTINELS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_null_sentinel(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text.eq_ignore_ascii_case("nan") || NULL_SENTINELS.contains(&text)
}

/// Fold every "missing" sentinel (blank text, NaN-like text, non-finite numbers) into `None`.
pub fn clean_cell(cell: Option<&Cell>) -> Option<Cell> {
    match cell? {
        Cell::Text(s) => {
            let s = s.trim();
            if is_null_sentinel(s) {
                None
            } else {
                Some(Cell::Text(s.to_string()))
            }
        }
        Cell::Number(n) if n.is_finite() => Some(Cell::Number(*n)),
        Cell::Number(_) => None,
    }
}

/// Clean a raw table into the canonical snapshot shape.
///
/// Row order is kept and no row is dropped, even a fully empty one.
pub fn normalize_table(raw: &RawTable) -> NormalizedTable {
    // 1) trimmed, unique headers
    let headers = dedup_headers(
        raw.columns
            .iter()
            .enumerate()
            .map(|(i, c)| clean_header(c, i))
            .collect(),
    );

    // 2) clean every cell, positional
    let cells: Vec<Vec<Option<Cell>>> = (0..raw.row_count())
        .map(|r| {
            (0..headers.len())
                .map(|c| clean_cell(raw.value(r, c)))
                .collect()
        })
        .collect();

    // 3) drop columns with no value anywhere
    let keep: Vec<usize> = (0..headers.len())
        .filter(|&c| cells.iter().any(|row| row[c].is_some()))
        .collect();
    if keep.len() < headers.len() {
        trace!(
            dropped = headers.len() - keep.len(),
            "dropping all-empty columns"
        );
    }

    let columns: Vec<String> = keep.iter().map(|&c| headers[c].clone()).collect();
    let rows = cells
        .into_iter()
        .map(|mut row| {
            keep.iter()
                .map(|&c| (headers[c].clone(), row[c].take()))
                .collect::<Row>()
        })
        .collect();

    NormalizedTable { columns, rows }
}
