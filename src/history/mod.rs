// src/history/mod.rs

//! Dated snapshots and the documents derived from them, persisted as JSON.

pub mod snapshot;
pub mod store;

pub use snapshot::{
    market_now, market_offset, resolve_snapshot_date, ChangesDocument, Snapshot, SourceIndex,
};
pub use store::SnapshotStore;
