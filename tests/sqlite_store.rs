use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use rusqlite::Connection;

use serialized_to_json::store::{EqFilter, PageCursor, SqliteTable, TableScanner, TableWriter};
use serialized_to_json::{EmptyValueFixer, FieldTarget, FixStrategy, Row, Value};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("s2jtest-sqlite-{prefix}-{pid}-{t}-{id}"))
}

/// sales(entity_id, info, note) with `n` rows; ids in `empty` get info = ''.
fn create_db(root: &PathBuf, n: i64, empty: &[i64]) -> Result<PathBuf> {
    fs::create_dir_all(root)?;
    let path = root.join("shop.db");
    let conn = Connection::open(&path)?;
    conn.execute_batch(
        "CREATE TABLE sales (entity_id INTEGER PRIMARY KEY, info TEXT, note TEXT);",
    )?;
    for i in 1..=n {
        let info = if empty.contains(&i) { "" } else { "a:0:{}" };
        conn.execute(
            "INSERT INTO sales (entity_id, info, note) VALUES (?1, ?2, ?3)",
            rusqlite::params![i, info, format!("note {i}")],
        )?;
    }
    Ok(path)
}

fn infos(path: &PathBuf) -> Result<Vec<String>> {
    let conn = Connection::open(path)?;
    let mut stmt = conn.prepare("SELECT info FROM sales ORDER BY entity_id")?;
    let rows = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[test]
fn count_and_pages() -> Result<()> {
    let root = unique_root("pages");
    let path = create_db(&root, 7, &[2, 6])?;
    let mut store = SqliteTable::open(&path)?;

    assert_eq!(store.count("sales")?, 7);
    assert_eq!(store.count_where("sales", &EqFilter::empty_string("info"))?, 2);

    let p1 = store.fetch_page("sales", &["entity_id", "info"], PageCursor::new(1, 3))?;
    let p3 = store.fetch_page("sales", &["entity_id", "info"], PageCursor::new(3, 3))?;
    assert_eq!(p1.len(), 3);
    assert_eq!(p3.len(), 1);
    assert_eq!(p1[1].get("info"), &Value::text(""));
    assert_eq!(p3[0].get("entity_id"), &Value::Integer(7));
    // projection: only the requested columns come back
    assert!(!p1[0].contains("note"));

    let past_end = store.fetch_page("sales", &["entity_id"], PageCursor::new(9, 3))?;
    assert!(past_end.is_empty());

    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn fetch_all_returns_full_rows() -> Result<()> {
    let root = unique_root("fetch-all");
    let path = create_db(&root, 5, &[1, 3, 5])?;
    let mut store = SqliteTable::open(&path)?;
    let filter = EqFilter::empty_string("info");

    let all = store.fetch_all("sales", &filter, None)?;
    assert_eq!(all.len(), 3);
    assert_eq!(all[1].get("note"), &Value::text("note 3"));
    assert_eq!(store.fetch_all("sales", &filter, Some(2))?.len(), 2);

    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn update_and_rollback() -> Result<()> {
    let root = unique_root("rollback");
    let path = create_db(&root, 3, &[1, 2, 3])?;
    let mut store = SqliteTable::open(&path)?;

    let res: Result<()> = store.atomic(|tx| {
        let row = Row::new()
            .with("entity_id", 1)
            .with("info", "s:0:\"\";")
            .with("note", "note 1");
        assert_eq!(tx.update_row("sales", "entity_id", &row)?, 1);
        Err(anyhow!("stop here"))
    });
    assert!(res.is_err());
    assert_eq!(infos(&path)?, vec!["", "", ""]);

    // no such id: zero rows affected
    let ghost = Row::new().with("entity_id", 99).with("info", "x");
    assert_eq!(store.update_row("sales", "entity_id", &ghost)?, 0);

    // missing id column is refused
    assert!(store
        .update_row("sales", "entity_id", &Row::new().with("info", "x"))
        .is_err());

    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn fixer_commits_once_against_sqlite() -> Result<()> {
    for strategy in [FixStrategy::Paged, FixStrategy::Single] {
        let root = unique_root("fix");
        let path = create_db(&root, 5, &[2, 4])?;
        let mut store = SqliteTable::open(&path)?;

        let outcome = EmptyValueFixer::new()
            .with_strategy(strategy)
            .with_page_size(1)
            .run(&mut store, &FieldTarget::new("sales", "entity_id", "info"))?;
        assert_eq!(outcome.replaced(), 2);
        drop(store);

        assert_eq!(
            infos(&path)?,
            vec!["a:0:{}", "s:0:\"\";", "a:0:{}", "s:0:\"\";", "a:0:{}"]
        );
        fs::remove_dir_all(&root)?;
    }
    Ok(())
}

#[test]
fn failing_update_leaves_database_untouched() -> Result<()> {
    let root = unique_root("trigger");
    let path = create_db(&root, 3, &[1, 2, 3])?;
    {
        let conn = Connection::open(&path)?;
        conn.execute_batch(
            "CREATE TRIGGER no_third BEFORE UPDATE ON sales WHEN NEW.entity_id = 3
             BEGIN SELECT RAISE(ABORT, 'row 3 is locked'); END;",
        )?;
    }
    let mut store = SqliteTable::open(&path)?;

    let err = EmptyValueFixer::new()
        .run(&mut store, &FieldTarget::new("sales", "entity_id", "info"))
        .unwrap_err();
    assert!(format!("{:#}", err).contains("row 3 is locked"));
    assert!(store.connection().is_autocommit());
    drop(store);

    assert_eq!(infos(&path)?, vec!["", "", ""]);
    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn missing_database_file_is_an_error() {
    let root = unique_root("missing");
    assert!(SqliteTable::open(&root.join("nope.db")).is_err());
}

#[test]
fn unknown_column_is_an_error_not_a_literal() -> Result<()> {
    let root = unique_root("ident");
    let path = create_db(&root, 1, &[])?;
    let mut store = SqliteTable::open(&path)?;
    assert!(store
        .fetch_page("sales", &["entity_id", "no_such"], PageCursor::new(1, 10))
        .is_err());
    assert!(store.count("no_such_table").is_err());
    fs::remove_dir_all(&root)?;
    Ok(())
}
