//! Scrapes fund/ETF holdings tables, files them as dated snapshots and
//! reports day-over-day changes per source.

pub mod config;
pub mod diff;
pub mod error;
pub mod fetch;
pub mod history;
pub mod holdings;
pub mod pipeline;
pub mod table;

pub use error::HoldingsError;
