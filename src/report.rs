//! Validation report: banner, violation lines, summary; and where it gets written.
//!
//! Layout (newline-joined, no trailing newline):
//!   Validation result for field "<field>" in table "<table>":
//!   <id_field>: <row id> - <reason>
//!   ...
//!   Invalid records count: <N>
//!
//! With a line cap, violations past the cap are counted but not stored, and one
//! "... <k> more invalid records not listed" line precedes the summary.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::consts::{REPORT_FILE_NAME, SUMMARY_PREFIX};
use crate::row::Value;

/// `<id_field>: <row id> - <reason>`
pub fn violation_line(id_field: &str, row_id: &Value, reason: &str) -> String {
    format!("{}: {} - {}", id_field, row_id, reason)
}

pub fn banner(table: &str, field: &str) -> String {
    format!(
        "Validation result for field \"{}\" in table \"{}\":",
        field, table
    )
}

#[derive(Clone, Debug)]
pub struct ValidationReport {
    lines: Vec<String>,
    invalid_count: u64,
    max_lines: Option<usize>,
    stored: usize,
    omitted: u64,
    finished: bool,
}

impl ValidationReport {
    pub fn new(table: &str, field: &str) -> Self {
        Self {
            lines: vec![banner(table, field)],
            invalid_count: 0,
            max_lines: None,
            stored: 0,
            omitted: 0,
            finished: false,
        }
    }

    /// Cap on stored violation lines (None = keep all).
    pub fn with_max_lines(mut self, max: Option<usize>) -> Self {
        self.max_lines = max;
        self
    }

    /// One invalid row. Always counted; stored unless the cap is reached.
    pub fn record(&mut self, id_field: &str, row_id: &Value, reason: &str) {
        debug_assert!(!self.finished, "record after finish");
        self.invalid_count += 1;
        if self.max_lines.map_or(true, |max| self.stored < max) {
            self.lines.push(violation_line(id_field, row_id, reason));
            self.stored += 1;
        } else {
            self.omitted += 1;
        }
    }

    pub fn invalid_count(&self) -> u64 {
        self.invalid_count
    }

    pub fn omitted(&self) -> u64 {
        self.omitted
    }

    pub fn summary_line(&self) -> String {
        format!("{}{}", SUMMARY_PREFIX, self.invalid_count)
    }

    /// Append the closing lines. Calling it twice is a no-op.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        if self.omitted > 0 {
            self.lines
                .push(format!("... {} more invalid records not listed", self.omitted));
        }
        let summary = self.summary_line();
        self.lines.push(summary);
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// Destination of the finished report.
pub trait ReportSink {
    /// Replace any previous report with `contents`; returns where it went.
    fn write_report(&mut self, contents: &str) -> Result<String>;
}

/// `<log_dir>/serialized_to_json_validation.log`, replaced atomically (tmp + rename).
#[derive(Clone, Debug)]
pub struct FileReportSink {
    path: PathBuf,
}

impl FileReportSink {
    pub fn new(log_dir: &Path) -> Self {
        Self {
            path: log_dir.join(REPORT_FILE_NAME),
        }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for FileReportSink {
    fn write_report(&mut self, contents: &str) -> Result<String> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("create log dir {}", dir.display()))?;
            }
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| REPORT_FILE_NAME.to_string());
        let tmp = self.path.with_file_name(format!("{}.tmp", file_name));
        let _ = fs::remove_file(&tmp);

        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .with_context(|| format!("open report tmp {}", tmp.display()))?;
        f.write_all(contents.as_bytes())
            .with_context(|| format!("write report {}", tmp.display()))?;
        f.sync_all()?;
        drop(f);

        fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        Ok(self.path.display().to_string())
    }
}

/// Keeps written reports in memory; `failing()` makes every write an error.
#[derive(Clone, Debug, Default)]
pub struct MemReportSink {
    pub written: Vec<String>,
    fail: bool,
}

impl MemReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            written: Vec::new(),
            fail: true,
        }
    }

    pub fn last(&self) -> Option<&str> {
        self.written.last().map(|s| s.as_str())
    }
}

impl ReportSink for MemReportSink {
    fn write_report(&mut self, contents: &str) -> Result<String> {
        if self.fail {
            return Err(anyhow::anyhow!("report sink is not writable"));
        }
        self.written.push(contents.to_string());
        Ok("memory".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_has_banner_and_zero_summary() {
        let mut r = ValidationReport::new("foo", "f");
        r.finish();
        r.finish();
        assert_eq!(
            r.render(),
            "Validation result for field \"f\" in table \"foo\":\nInvalid records count: 0"
        );
    }

    #[test]
    fn cap_keeps_counting() {
        let mut r = ValidationReport::new("t", "f").with_max_lines(Some(2));
        for i in 1..=5 {
            r.record("id", &Value::Integer(i), "contains empty value");
        }
        r.finish();
        assert_eq!(r.invalid_count(), 5);
        assert_eq!(r.omitted(), 3);
        assert_eq!(
            r.lines(),
            &[
                "Validation result for field \"f\" in table \"t\":".to_string(),
                "id: 1 - contains empty value".to_string(),
                "id: 2 - contains empty value".to_string(),
                "... 3 more invalid records not listed".to_string(),
                "Invalid records count: 5".to_string(),
            ]
        );
    }

    #[test]
    fn file_sink_overwrites() -> Result<()> {
        let dir = std::env::temp_dir().join(format!(
            "s2j-report-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let mut sink = FileReportSink::new(&dir.join("nested"));
        sink.write_report("first\nrun")?;
        let loc = sink.write_report("second")?;
        assert!(loc.ends_with("serialized_to_json_validation.log"));
        assert_eq!(fs::read_to_string(sink.path())?, "second");
        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }
}
