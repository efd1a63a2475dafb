//! store/sqlite - TableScanner / TableWriter over a rusqlite Connection.
//!
//! Identifiers come from the command line and are always quoted with backticks
//! (embedded backticks doubled). SQLite never falls back to a string literal for a
//! backtick-quoted name, so a typo in a column name is an error, not a constant.
//!
//! Units of work are plain `BEGIN IMMEDIATE` / `COMMIT` / `ROLLBACK` on the connection.

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, ToSql};
use std::path::Path;

use super::{EqFilter, PageCursor, TableScanner, TableWriter};
use crate::row::{Row, Value};

pub struct SqliteTable {
    conn: Connection,
}

impl SqliteTable {
    /// Open an existing database file read-write. A missing file is an error.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("open sqlite database {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite database")?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn query_rows<P>(&self, sql: &str, params: P) -> Result<Vec<Row>>
    where
        P: rusqlite::Params,
    {
        let mut stmt = self
            .conn
            .prepare(sql)
            .with_context(|| format!("prepare `{}`", sql))?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params).with_context(|| format!("query `{}`", sql))?;
        let mut out = Vec::new();
        while let Some(r) = rows.next()? {
            let mut row = Row::new();
            for (i, name) in names.iter().enumerate() {
                row.set(name, value_from_ref(r.get_ref(i)?));
            }
            out.push(row);
        }
        Ok(out)
    }

    fn query_count<P>(&self, sql: &str, params: P) -> Result<u64>
    where
        P: rusqlite::Params,
    {
        let n: i64 = self
            .conn
            .query_row(sql, params, |r| r.get(0))
            .with_context(|| format!("query `{}`", sql))?;
        Ok(n.max(0) as u64)
    }
}

impl TableScanner for SqliteTable {
    fn count(&mut self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        self.query_count(&sql, [])
    }

    fn count_where(&mut self, table: &str, filter: &EqFilter) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?1",
            quote_ident(table),
            quote_ident(&filter.column)
        );
        self.query_count(&sql, [&filter.value])
    }

    fn fetch_page(
        &mut self,
        table: &str,
        columns: &[&str],
        cursor: PageCursor,
    ) -> Result<Vec<Row>> {
        let cols = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM {} LIMIT ?1 OFFSET ?2",
            cols,
            quote_ident(table)
        );
        debug!(
            "sqlite: page {} (offset {}, size {}) of {}",
            cursor.page,
            cursor.offset(),
            cursor.size,
            table
        );
        self.query_rows(&sql, [to_i64(cursor.size)?, to_i64(cursor.offset())?])
    }

    fn fetch_all(
        &mut self,
        table: &str,
        filter: &EqFilter,
        limit: Option<u64>,
    ) -> Result<Vec<Row>> {
        let mut sql = format!(
            "SELECT * FROM {} WHERE {} = ?1",
            quote_ident(table),
            quote_ident(&filter.column)
        );
        match limit {
            Some(n) => {
                sql.push_str(" LIMIT ?2");
                self.query_rows(&sql, rusqlite::params![&filter.value, to_i64(n)?])
            }
            None => self.query_rows(&sql, [&filter.value]),
        }
    }
}

impl TableWriter for SqliteTable {
    fn update_row(&mut self, table: &str, id_field: &str, row: &Row) -> Result<u64> {
        let id = row.get(id_field);
        if matches!(id, Value::Missing) {
            return Err(anyhow!("row has no '{}' column", id_field));
        }

        let mut sets = Vec::with_capacity(row.len());
        let mut values: Vec<&Value> = Vec::with_capacity(row.len() + 1);
        for (i, (col, v)) in row.columns().enumerate() {
            sets.push(format!("{} = ?{}", quote_ident(col), i + 1));
            values.push(v);
        }
        if sets.is_empty() {
            return Err(anyhow!("nothing to update"));
        }
        values.push(id);

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            quote_ident(table),
            sets.join(", "),
            quote_ident(id_field),
            values.len()
        );
        let n = self
            .conn
            .execute(&sql, params_from_iter(values))
            .with_context(|| format!("update {} where {} = {}", table, id_field, id))?;
        Ok(n as u64)
    }

    fn atomic<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .context("begin transaction")?;

        let res = f(self).and_then(|v| {
            self.conn.execute_batch("COMMIT").context("commit")?;
            Ok(v)
        });

        if res.is_err() && !self.conn.is_autocommit() {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("sqlite: rollback failed: {}", e);
            }
        }
        res
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null | Value::Missing => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Borrowed(ValueRef::Real(*r)),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

/// TEXT that is not UTF-8 comes back as a Blob so no byte is lost.
fn value_from_ref(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) => match std::str::from_utf8(t) {
            Ok(s) => Value::Text(s.to_string()),
            Err(_) => Value::Blob(t.to_vec()),
        },
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn to_i64(n: u64) -> Result<i64> {
    i64::try_from(n).map_err(|_| anyhow!("value {} does not fit into a SQL integer", n))
}
