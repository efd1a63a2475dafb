//! Lightweight global metrics for the migration commands.
//!
//! Thread-safe atomic counters for:
//! - Validator scan (pages, rows, violations)
//! - Empty-value fixer (rows fixed, commits, rollbacks)

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ----- Scan -----
static PAGES_FETCHED: AtomicU64 = AtomicU64::new(0);
static ROWS_SCANNED: AtomicU64 = AtomicU64::new(0);
static VIOLATIONS_RECORDED: AtomicU64 = AtomicU64::new(0);

// ----- Fix -----
static ROWS_FIXED: AtomicU64 = AtomicU64::new(0);
static FIX_COMMITS: AtomicU64 = AtomicU64::new(0);
static FIX_ROLLBACKS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    // Scan
    pub pages_fetched: u64,
    pub rows_scanned: u64,
    pub violations_recorded: u64,

    // Fix
    pub rows_fixed: u64,
    pub fix_commits: u64,
    pub fix_rollbacks: u64,
}

impl MetricsSnapshot {
    /// Share of scanned rows that ended up in the report.
    pub fn violation_ratio(&self) -> f64 {
        if self.rows_scanned == 0 {
            0.0
        } else {
            self.violations_recorded as f64 / self.rows_scanned as f64
        }
    }

    /// One-line JSON form for log output.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pages_fetched={} rows_scanned={} violations={} ({:.2}%) rows_fixed={} commits={} rollbacks={}",
            self.pages_fetched,
            self.rows_scanned,
            self.violations_recorded,
            self.violation_ratio() * 100.0,
            self.rows_fixed,
            self.fix_commits,
            self.fix_rollbacks,
        )
    }
}

// ----- Recorders (scan) -----
pub fn record_page_fetched(rows: usize) {
    PAGES_FETCHED.fetch_add(1, Ordering::Relaxed);
    ROWS_SCANNED.fetch_add(rows as u64, Ordering::Relaxed);
}

pub fn record_violation() {
    VIOLATIONS_RECORDED.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (fix) -----
pub fn record_fix_commit(rows: u64) {
    FIX_COMMITS.fetch_add(1, Ordering::Relaxed);
    ROWS_FIXED.fetch_add(rows, Ordering::Relaxed);
}

pub fn record_fix_rollback() {
    FIX_ROLLBACKS.fetch_add(1, Ordering::Relaxed);
}

// ----- Snapshot / Reset -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        pages_fetched: PAGES_FETCHED.load(Ordering::Relaxed),
        rows_scanned: ROWS_SCANNED.load(Ordering::Relaxed),
        violations_recorded: VIOLATIONS_RECORDED.load(Ordering::Relaxed),

        rows_fixed: ROWS_FIXED.load(Ordering::Relaxed),
        fix_commits: FIX_COMMITS.load(Ordering::Relaxed),
        fix_rollbacks: FIX_ROLLBACKS.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    PAGES_FETCHED.store(0, Ordering::Relaxed);
    ROWS_SCANNED.store(0, Ordering::Relaxed);
    VIOLATIONS_RECORDED.store(0, Ordering::Relaxed);

    ROWS_FIXED.store(0, Ordering::Relaxed);
    FIX_COMMITS.store(0, Ordering::Relaxed);
    FIX_ROLLBACKS.store(0, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_every_counter() {
        let snap = MetricsSnapshot {
            rows_scanned: 4,
            violations_recorded: 1,
            ..Default::default()
        };
        assert_eq!(snap.violation_ratio(), 0.25);
        let v: serde_json::Value = serde_json::from_str(&snap.to_json()).unwrap();
        assert_eq!(v["rows_scanned"], 4);
        assert_eq!(v["fix_rollbacks"], 0);
    }
}
