//! EmptyValueFixer - replace `''` in one column with the serialized empty string.
//!
//! - Count first: zero matches is a successful no-op and no unit of work is opened.
//! - Otherwise every update runs inside ONE `TableWriter::atomic` call: either all
//!   empty rows are fixed or none are.
//! - Row copies keep every other column; only `field` changes.
//! - An update that touches zero rows is a failure (a paged run would otherwise keep
//!   fetching the same row forever).

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};

use crate::config::{FixStrategy, MigrateConfig};
use crate::consts::ROWS_PER_PAGE;
use crate::metrics;
use crate::phpser::empty_string_placeholder;
use crate::row::{Row, Value};
use crate::store::{EqFilter, TableScanner, TableWriter};
use crate::FieldTarget;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixOutcome {
    /// No row had `field = ''`; nothing was opened or written.
    NothingToFix,
    /// `found` rows matched before the run, `replaced` rows were rewritten and committed.
    Replaced { found: u64, replaced: u64 },
}

impl FixOutcome {
    pub fn replaced(&self) -> u64 {
        match self {
            FixOutcome::NothingToFix => 0,
            FixOutcome::Replaced { replaced, .. } => *replaced,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EmptyValueFixer {
    strategy: FixStrategy,
    page_size: u64,
}

impl Default for EmptyValueFixer {
    fn default() -> Self {
        Self {
            strategy: FixStrategy::Paged,
            page_size: ROWS_PER_PAGE,
        }
    }
}

impl EmptyValueFixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &MigrateConfig) -> Self {
        Self::new()
            .with_strategy(cfg.fix_strategy)
            .with_page_size(cfg.page_size)
    }

    pub fn with_strategy(mut self, strategy: FixStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Zero is ignored.
    pub fn with_page_size(mut self, rows: u64) -> Self {
        if rows > 0 {
            self.page_size = rows;
        }
        self
    }

    /// Number of rows whose field is currently `''`.
    pub fn count_empty<S: TableScanner>(
        &self,
        store: &mut S,
        target: &FieldTarget,
    ) -> Result<u64> {
        store
            .count_where(&target.table, &EqFilter::empty_string(&target.field))
            .with_context(|| format!("count empty values of {}.{}", target.table, target.field))
    }

    /// Count, then fix everything in one unit of work.
    pub fn run<S: TableWriter>(
        &self,
        store: &mut S,
        target: &FieldTarget,
    ) -> Result<FixOutcome> {
        let found = self.count_empty(store, target)?;
        if found == 0 {
            info!(
                "fix {}.{}: no empty values, nothing to do",
                target.table, target.field
            );
            return Ok(FixOutcome::NothingToFix);
        }
        self.replace_all(store, target, found)
    }

    /// The transactional part of `run`, for callers that already know `found`.
    pub fn replace_all<S: TableWriter>(
        &self,
        store: &mut S,
        target: &FieldTarget,
        found: u64,
    ) -> Result<FixOutcome> {
        if target.field == target.id_field {
            bail!(
                "field '{}' cannot be fixed while also used as the row identifier",
                target.field
            );
        }

        let placeholder = Value::Text(empty_string_placeholder());
        info!(
            "fix {}.{}: {} empty value(s), strategy {}",
            target.table,
            target.field,
            found,
            self.strategy.as_str()
        );

        let res = store.atomic(|tx| match self.strategy {
            FixStrategy::Single => fix_single(tx, target, &placeholder),
            FixStrategy::Paged => fix_paged(tx, target, &placeholder, self.page_size),
        });

        match res {
            Ok(replaced) => {
                metrics::record_fix_commit(replaced);
                info!(
                    "fix {}.{}: committed, {} row(s) replaced",
                    target.table, target.field, replaced
                );
                Ok(FixOutcome::Replaced { found, replaced })
            }
            Err(e) => {
                metrics::record_fix_rollback();
                warn!(
                    "fix {}.{}: rolled back: {:#}",
                    target.table, target.field, e
                );
                Err(e)
            }
        }
    }
}

fn fix_single<S: TableWriter>(
    tx: &mut S,
    target: &FieldTarget,
    placeholder: &Value,
) -> Result<u64> {
    let rows = tx.fetch_all(&target.table, &EqFilter::empty_string(&target.field), None)?;
    debug!("fix: fetched {} row(s) in a single query", rows.len());
    let mut replaced = 0;
    for row in &rows {
        replaced += update_one(tx, target, row, placeholder)?;
    }
    Ok(replaced)
}

fn fix_paged<S: TableWriter>(
    tx: &mut S,
    target: &FieldTarget,
    placeholder: &Value,
    page_size: u64,
) -> Result<u64> {
    let filter = EqFilter::empty_string(&target.field);
    let mut replaced = 0;
    let mut batch = 0u64;
    loop {
        // Fixed rows no longer match the filter, so every batch starts at the top.
        let rows = tx.fetch_all(&target.table, &filter, Some(page_size))?;
        if rows.is_empty() {
            break;
        }
        batch += 1;
        debug!("fix: batch {} with {} row(s)", batch, rows.len());
        for row in &rows {
            replaced += update_one(tx, target, row, placeholder)?;
        }
    }
    Ok(replaced)
}

fn update_one<S: TableWriter>(
    tx: &mut S,
    target: &FieldTarget,
    row: &Row,
    placeholder: &Value,
) -> Result<u64> {
    let id = row.get(&target.id_field);
    if matches!(id, Value::Null | Value::Missing) {
        return Err(anyhow!(
            "row without '{}' cannot be updated in {}",
            target.id_field,
            target.table
        ));
    }

    let fixed = row.replaced(&target.field, placeholder.clone());
    let n = tx.update_row(&target.table, &target.id_field, &fixed)?;
    if n == 0 {
        return Err(anyhow!(
            "update of {} where {} = {} changed no rows",
            target.table,
            target.id_field,
            id
        ));
    }
    Ok(n)
}
