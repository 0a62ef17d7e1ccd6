// src/holdings/mod.rs

//! Reading holdings out of arbitrary provider schemas: which column means what,
//! and how each row becomes a keyed record.

pub mod record;
pub mod roles;

pub use record::{build_index, build_record, to_float, to_int, Record, RecordIndex};
pub use roles::{detect_columns, ColumnRoles, Role};
