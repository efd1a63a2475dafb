//! FieldValidator - paged scan of one column, report of rows that are neither JSON nor
//! PHP-serialized.
//!
//! Phases: Init -> Counting -> Paging(1..=pages) -> Summarizing -> Flushed.
//! The report is a plain value owned by one run and threaded through the page loop.
//! Per-row classification problems never abort the run; store errors and sink errors do.

use anyhow::{Context, Result};
use log::{debug, info, trace};
use std::fmt;

use crate::classify::classify;
use crate::config::MigrateConfig;
use crate::consts::ROWS_PER_PAGE;
use crate::metrics;
use crate::report::{ReportSink, ValidationReport};
use crate::store::{page_count, pages, TableScanner};
use crate::FieldTarget;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Init,
    Counting,
    Paging(u64),
    Summarizing,
    Flushed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => f.write_str("init"),
            Phase::Counting => f.write_str("counting"),
            Phase::Paging(p) => write!(f, "paging({})", p),
            Phase::Summarizing => f.write_str("summarizing"),
            Phase::Flushed => f.write_str("flushed"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ValidationOutcome {
    pub report: ValidationReport,
    /// Where the sink put the report (file path for the file sink).
    pub location: String,
    pub total_rows: u64,
    pub pages: u64,
}

impl ValidationOutcome {
    pub fn invalid_count(&self) -> u64 {
        self.report.invalid_count()
    }
}

#[derive(Clone, Debug)]
pub struct FieldValidator {
    page_size: u64,
    max_report_lines: Option<usize>,
}

impl Default for FieldValidator {
    fn default() -> Self {
        Self {
            page_size: ROWS_PER_PAGE,
            max_report_lines: None,
        }
    }
}

impl FieldValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &MigrateConfig) -> Self {
        Self::new()
            .with_page_size(cfg.page_size)
            .with_max_report_lines(cfg.report_max_lines)
    }

    /// Zero is ignored.
    pub fn with_page_size(mut self, rows: u64) -> Self {
        if rows > 0 {
            self.page_size = rows;
        }
        self
    }

    pub fn with_max_report_lines(mut self, max: Option<usize>) -> Self {
        self.max_report_lines = max;
        self
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Count, page through and summarize; nothing is written anywhere.
    /// Returns the finished report plus (total rows, pages scanned).
    pub fn scan<S: TableScanner>(
        &self,
        store: &mut S,
        target: &FieldTarget,
    ) -> Result<(ValidationReport, u64, u64)> {
        let mut phase = Phase::Init;
        let mut report = ValidationReport::new(&target.table, &target.field)
            .with_max_lines(self.max_report_lines);

        phase = advance(phase, Phase::Counting);
        let total = store
            .count(&target.table)
            .with_context(|| format!("count rows of {}", target.table))?;
        let total_pages = page_count(total, self.page_size);
        info!(
            "validate {}.{}: {} rows, {} page(s) of {}",
            target.table, target.field, total, total_pages, self.page_size
        );

        let columns = [target.id_field.as_str(), target.field.as_str()];
        for cursor in pages(total, self.page_size) {
            phase = advance(phase, Phase::Paging(cursor.page));
            let rows = store
                .fetch_page(&target.table, &columns, cursor)
                .with_context(|| format!("fetch page {} of {}", cursor.page, target.table))?;
            metrics::record_page_fetched(rows.len());

            for row in &rows {
                let class = classify(row.get(&target.field));
                if let Some(reason) = class.reason() {
                    let id = row.get(&target.id_field);
                    trace!("{}: {} - {}", target.id_field, id, reason);
                    report.record(&target.id_field, id, reason);
                    metrics::record_violation();
                }
            }
        }

        phase = advance(phase, Phase::Summarizing);
        report.finish();
        debug!("validate: {} after {} page(s)", phase, total_pages);

        Ok((report, total, total_pages))
    }

    /// Full run: scan, then flush the report to `sink` once.
    pub fn run<S, K>(
        &self,
        store: &mut S,
        sink: &mut K,
        target: &FieldTarget,
    ) -> Result<ValidationOutcome>
    where
        S: TableScanner,
        K: ReportSink,
    {
        let (report, total_rows, pages) = self.scan(store, target)?;

        let location = sink
            .write_report(&report.render())
            .context("write validation report")?;
        advance(Phase::Summarizing, Phase::Flushed);
        info!(
            "validate {}.{}: {} invalid record(s), report at {}",
            target.table,
            target.field,
            report.invalid_count(),
            location
        );

        Ok(ValidationOutcome {
            report,
            location,
            total_rows,
            pages,
        })
    }
}

fn advance(from: Phase, to: Phase) -> Phase {
    debug!("validate: {} -> {}", from, to);
    to
}
