//! store - data access for one named table.
//!
//! - mod.rs    - TableScanner / TableWriter traits, PageCursor, EqFilter, page math
//! - sqlite.rs - rusqlite-backed implementation (the CLI uses this one)
//! - mem.rs    - in-memory table with failure injection, for tests and dry runs
//!
//! Pagination is LIMIT/OFFSET over the store's natural order (no ORDER BY). Rows inserted
//! or deleted by someone else during a scan can shift later pages: rows may be skipped
//! or seen twice. Counts are not snapshotted either.

use anyhow::Result;

use crate::row::{Row, Value};

pub mod mem;
pub mod sqlite;

pub use mem::MemTable;
pub use sqlite::SqliteTable;

/// (page, size) with 1-based page numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageCursor {
    pub page: u64,
    pub size: u64,
}

impl PageCursor {
    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    /// Rows skipped before this page: (page-1)*size.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }
}

/// ceil(total / size); 0 rows -> 0 pages.
pub fn page_count(total: u64, size: u64) -> u64 {
    if size == 0 {
        return 0;
    }
    total.div_ceil(size)
}

/// Cursors for pages 1..=page_count(total, size), in order.
pub fn pages(total: u64, size: u64) -> impl Iterator<Item = PageCursor> {
    (1..=page_count(total, size)).map(move |p| PageCursor::new(p, size))
}

/// `column = value` predicate.
#[derive(Clone, Debug, PartialEq)]
pub struct EqFilter {
    pub column: String,
    pub value: Value,
}

impl EqFilter {
    pub fn new<V: Into<Value>>(column: &str, value: V) -> Self {
        Self {
            column: column.to_string(),
            value: value.into(),
        }
    }

    /// `column = ''`
    pub fn empty_string(column: &str) -> Self {
        Self::new(column, "")
    }
}

/// Read side.
pub trait TableScanner {
    /// COUNT(*) at call time.
    fn count(&mut self, table: &str) -> Result<u64>;

    fn count_where(&mut self, table: &str, filter: &EqFilter) -> Result<u64>;

    /// Rows [offset, offset+size) projected to `columns`.
    fn fetch_page(
        &mut self,
        table: &str,
        columns: &[&str],
        cursor: PageCursor,
    ) -> Result<Vec<Row>>;

    /// Full rows matching `filter`; `limit = None` returns all of them in one go.
    fn fetch_all(
        &mut self,
        table: &str,
        filter: &EqFilter,
        limit: Option<u64>,
    ) -> Result<Vec<Row>>;
}

/// Write side.
pub trait TableWriter: TableScanner {
    /// UPDATE every column of `row` WHERE id_field = row[id_field]. Returns rows affected.
    fn update_row(&mut self, table: &str, id_field: &str, row: &Row) -> Result<u64>;

    /// Run `f` as one unit of work: commit on Ok, roll back everything on Err.
    fn atomic<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>;
}
