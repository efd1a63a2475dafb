use anyhow::{anyhow, Result};
use log::info;
use std::io::Write;

use crate::config::MigrateConfig;
use crate::fix::{EmptyValueFixer, FixOutcome};
use crate::metrics;
use crate::report::FileReportSink;
use crate::store::SqliteTable;
use crate::validate::{FieldValidator, ValidationOutcome};
use crate::FieldTarget;

fn open_store(cfg: &MigrateConfig) -> Result<SqliteTable> {
    let path = cfg.database.as_ref().ok_or_else(|| {
        anyhow!(
            "no database configured: set {} to the SQLite file to migrate",
            crate::consts::ENV_DATABASE
        )
    })?;
    SqliteTable::open(path)
}

pub fn cmd_empty_values_fix(
    cfg: &MigrateConfig,
    target: &FieldTarget,
    out: &mut dyn Write,
) -> Result<FixOutcome> {
    let mut store = open_store(cfg)?;
    let fixer = EmptyValueFixer::from_config(cfg);

    let found = fixer.count_empty(&mut store, target)?;
    if found == 0 {
        writeln!(
            out,
            "The \"{}\" field does not contain empty values in \"{}\" table",
            target.field, target.table
        )?;
        return Ok(FixOutcome::NothingToFix);
    }
    writeln!(out, "Empty values count: {}", found)?;

    let outcome = match fixer.replace_all(&mut store, target, found) {
        Ok(outcome) => outcome,
        Err(e) => {
            writeln!(out, "{:#}", e)?;
            return Err(e);
        }
    };
    writeln!(out, "Successfully replaced empty values")?;
    info!("metrics: {}", metrics::snapshot().to_json());
    Ok(outcome)
}

pub fn cmd_validate(
    cfg: &MigrateConfig,
    target: &FieldTarget,
    out: &mut dyn Write,
) -> Result<ValidationOutcome> {
    let mut store = open_store(cfg)?;
    let mut sink = FileReportSink::new(&cfg.log_dir);

    let outcome = FieldValidator::from_config(cfg).run(&mut store, &mut sink, target)?;
    writeln!(out, "{}", outcome.report.summary_line())?;
    writeln!(out, "Result output: {}", outcome.location)?;
    info!("metrics: {}", metrics::snapshot().to_json());
    Ok(outcome)
}
