// src/error.rs

use thiserror::Error;

/// Structural failures raised to the caller of a source cycle.
///
/// Value-level problems (unparsable weights, share counts) never show up here:
/// coercion degrades them to absent values instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HoldingsError {
    /// The table selector was handed an empty candidate list.
    #[error("no tables found")]
    NoTablesFound,

    /// A configured source names a transport we don't know how to fetch.
    #[error("unknown source type: {0}")]
    UnknownSourceType(String),
}
