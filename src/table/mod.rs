// src/table/mod.rs

pub mod csv_reader;
pub mod html;
pub mod normalize;
pub mod select;

pub use normalize::normalize_table;
pub use select::select_holdings_table;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single scalar pulled out of a provider table.
///
/// Freshly extracted tables only carry text; numbers show up when a snapshot
/// written by an earlier tool is read back from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            // integral values print without a trailing ".0" so "2330" stays "2330"
            Cell::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Cell::Number(n) => write!(f, "{}", n),
        }
    }
}

/// One normalized row: column name → value, `None` standing for every flavour of missing.
/// Keys keep the table's column order, on disk too.
pub type Row = IndexMap<String, Option<Cell>>;

/// A table exactly as the transport extracted it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Header cells in source order. May repeat and may carry stray whitespace.
    pub columns: Vec<String>,
    /// Data rows, positional against `columns`. Short rows are missing their tail.
    pub rows: Vec<Vec<Option<Cell>>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<Cell>>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Value at (`row`, `col`), treating out-of-range positions as missing.
    pub fn value(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row)?.get(col)?.as_ref()
    }
}

/// A cleaned table ready to be persisted as a snapshot.
///
/// Column names are unique and every row carries exactly those keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl NormalizedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
