//! store/mem - in-memory table store.
//!
//! Behaves like the SQLite store (natural insertion order, LIMIT/OFFSET paging, projected
//! columns come back as `Value::Missing` when a row lacks them) and additionally:
//! - records every page request and every unit of work that was opened;
//! - can be told to fail the update of a specific row, to exercise rollbacks.

use anyhow::{anyhow, Result};
use std::collections::BTreeMap;

use super::{EqFilter, PageCursor, TableScanner, TableWriter};
use crate::row::{Row, Value};

#[derive(Clone, Debug, Default)]
pub struct MemTable {
    tables: BTreeMap<String, Vec<Row>>,
    /// (column, value): updating a row whose column equals value fails.
    fail_update: Option<(String, Value)>,
    page_requests: Vec<PageCursor>,
    transactions: u64,
    in_transaction: bool,
}

impl MemTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, rows: Vec<Row>) -> Self {
        self.tables.insert(name.to_string(), rows);
        self
    }

    pub fn insert(&mut self, table: &str, row: Row) {
        self.tables.entry(table.to_string()).or_default().push(row);
    }

    /// Current contents of `table` (empty slice for unknown tables).
    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Make `update_row` fail for rows whose `column` equals `value`.
    pub fn fail_update_when<V: Into<Value>>(&mut self, column: &str, value: V) {
        self.fail_update = Some((column.to_string(), value.into()));
    }

    pub fn page_requests(&self) -> &[PageCursor] {
        &self.page_requests
    }

    pub fn transactions_opened(&self) -> u64 {
        self.transactions
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn table(&self, table: &str) -> Result<&Vec<Row>> {
        self.tables
            .get(table)
            .ok_or_else(|| anyhow!("no such table: {}", table))
    }

    fn table_mut(&mut self, table: &str) -> Result<&mut Vec<Row>> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| anyhow!("no such table: {}", table))
    }
}

/// SQL equality: NULL never equals anything.
fn sql_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null | Value::Missing, _) | (_, Value::Null | Value::Missing) => false,
        _ => a == b,
    }
}

impl TableScanner for MemTable {
    fn count(&mut self, table: &str) -> Result<u64> {
        Ok(self.table(table)?.len() as u64)
    }

    fn count_where(&mut self, table: &str, filter: &EqFilter) -> Result<u64> {
        let n = self
            .table(table)?
            .iter()
            .filter(|r| sql_eq(r.get(&filter.column), &filter.value))
            .count();
        Ok(n as u64)
    }

    fn fetch_page(
        &mut self,
        table: &str,
        columns: &[&str],
        cursor: PageCursor,
    ) -> Result<Vec<Row>> {
        self.page_requests.push(cursor);
        let rows = self
            .table(table)?
            .iter()
            .skip(cursor.offset() as usize)
            .take(cursor.size as usize)
            .map(|r| r.project(columns))
            .collect();
        Ok(rows)
    }

    fn fetch_all(
        &mut self,
        table: &str,
        filter: &EqFilter,
        limit: Option<u64>,
    ) -> Result<Vec<Row>> {
        let take = limit.map(|n| n as usize).unwrap_or(usize::MAX);
        let rows = self
            .table(table)?
            .iter()
            .filter(|r| sql_eq(r.get(&filter.column), &filter.value))
            .take(take)
            .cloned()
            .collect();
        Ok(rows)
    }
}

impl TableWriter for MemTable {
    fn update_row(&mut self, table: &str, id_field: &str, row: &Row) -> Result<u64> {
        if let Some((col, val)) = &self.fail_update {
            if sql_eq(row.get(col), val) {
                return Err(anyhow!(
                    "simulated failure updating {} where {} = {}",
                    table,
                    col,
                    val
                ));
            }
        }

        let id = row.get(id_field).clone();
        let mut n = 0;
        for r in self.table_mut(table)?.iter_mut() {
            if sql_eq(r.get(id_field), &id) {
                *r = row.clone();
                n += 1;
            }
        }
        Ok(n)
    }

    fn atomic<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let before = self.tables.clone();
        self.transactions += 1;
        self.in_transaction = true;
        let res = f(self);
        self.in_transaction = false;
        if res.is_err() {
            self.tables = before;
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemTable {
        MemTable::new().with_table(
            "t",
            (1..=5)
                .map(|i| Row::new().with("id", i).with("f", if i % 2 == 0 { "" } else { "x" }))
                .collect(),
        )
    }

    #[test]
    fn paging_and_projection() -> Result<()> {
        let mut m = sample();
        let p2 = m.fetch_page("t", &["id", "other"], PageCursor::new(2, 2))?;
        assert_eq!(p2.len(), 2);
        assert_eq!(p2[0].get("id"), &Value::Integer(3));
        assert_eq!(p2[0].get("other"), &Value::Missing);
        assert!(!p2[0].contains("f"));
        assert_eq!(m.fetch_page("t", &["id"], PageCursor::new(3, 2))?.len(), 1);
        assert_eq!(m.page_requests().len(), 2);
        Ok(())
    }

    #[test]
    fn filter_and_limit() -> Result<()> {
        let mut m = sample();
        let f = EqFilter::empty_string("f");
        assert_eq!(m.count_where("t", &f)?, 2);
        assert_eq!(m.fetch_all("t", &f, None)?.len(), 2);
        assert_eq!(m.fetch_all("t", &f, Some(1))?.len(), 1);
        assert!(m.count("missing").is_err());
        Ok(())
    }

    #[test]
    fn atomic_restores_on_error() {
        let mut m = sample();
        let res: Result<()> = m.atomic(|s| {
            s.update_row("t", "id", &Row::new().with("id", 1).with("f", "changed"))?;
            Err(anyhow!("boom"))
        });
        assert!(res.is_err());
        assert_eq!(m.rows("t")[0].get("f"), &Value::text("x"));
        assert_eq!(m.transactions_opened(), 1);
        assert!(!m.in_transaction());
    }
}
