// src/table/select.rs

use tracing::debug;

use super::RawTable;
use crate::error::HoldingsError;

/// Header fragments that mark a holdings table, one set per provider vocabulary.
static KEYWORD_SETS: &[&[&str]] = &[
    &["代號", "名稱", "比重"],
    &["股票代號", "股票名稱", "比重"],
    &["Ticker", "Name", "Weight"],
    &["代碼", "名稱", "權重"],
];

/// Score a candidate: header keyword hits dominate, then row count, then column count.
pub fn table_score(table: &RawTable) -> u64 {
    let header_text = table.columns.join(" ");
    let role_score = KEYWORD_SETS
        .iter()
        .map(|set| set.iter().filter(|k| header_text.contains(*k)).count())
        .max()
        .unwrap_or(0) as u64;

    role_score * 100_000 + table.row_count() as u64 * 100 + table.column_count() as u64
}

/// Pick the candidate most likely to be the holdings table.
///
/// Ties go to the earliest candidate.
pub fn select_holdings_table(candidates: &[RawTable]) -> Result<&RawTable, HoldingsError> {
    let mut best: Option<(&RawTable, u64)> = None;
    for (idx, table) in candidates.iter().enumerate() {
        let score = table_score(table);
        debug!(candidate = idx, score, rows = table.row_count(), "scored table");
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((table, score)),
        }
    }
    best.map(|(t, _)| t).ok_or(HoldingsError::NoTablesFound)
}
