//! Serialized-to-JSON migration helpers.
//!
//! Two commands over one table column:
//! - `validate`         - paged scan, report rows that are neither JSON nor PHP-serialized
//! - `empty-values-fix` - replace `''` with `s:0:"";` inside a single transaction

// Base modules
pub mod consts;
pub mod config;
pub mod metrics;
pub mod row;

// Legacy wire format (PHP serialize/unserialize)
pub mod phpser;
pub mod classify;

// Storage seam: TableScanner / TableWriter + SQLite and in-memory stores
pub mod store;

pub mod report;
pub mod validate;
pub mod fix;

pub mod cli;

// Convenience re-exports
pub use classify::{classify, Classification};
pub use config::{FixStrategy, MigrateConfig};
pub use fix::{EmptyValueFixer, FixOutcome};
pub use report::{FileReportSink, MemReportSink, ReportSink, ValidationReport};
pub use row::{Row, Value};
pub use store::{MemTable, SqliteTable, TableScanner, TableWriter};
pub use validate::{FieldValidator, ValidationOutcome};

/// Which column of which table a command works on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldTarget {
    pub table: String,
    /// Column that identifies a row (report lines, point updates).
    pub id_field: String,
    pub field: String,
}

impl FieldTarget {
    pub fn new(table: &str, id_field: &str, field: &str) -> Self {
        Self {
            table: table.to_string(),
            id_field: id_field.to_string(),
            field: field.to_string(),
        }
    }
}
