//! Centralized configuration for the migration commands.
//!
//! The CLI takes exactly three positional arguments per command, everything else
//! comes from the environment:
//! - S2J_DATABASE         - path to the SQLite database file (required by the CLI)
//! - S2J_LOG_DIR          - directory for the validation report (default "var/log")
//! - S2J_PAGE_SIZE        - rows per page (default 1000; 0 or garbage is ignored)
//! - S2J_FIX_STRATEGY     - "paged" (default) or "single"
//! - S2J_REPORT_MAX_LINES - cap on stored violation lines (default: unlimited)
//!
//! `from_lookup` is the core of `from_env` and takes any key -> value source.

use std::fmt;
use std::path::PathBuf;

use crate::consts::{
    DEFAULT_LOG_DIR, ENV_DATABASE, ENV_FIX_STRATEGY, ENV_LOG_DIR, ENV_PAGE_SIZE,
    ENV_REPORT_MAX_LINES, ROWS_PER_PAGE,
};

/// How the fixer collects rows with an empty field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixStrategy {
    /// Fetch the first `page_size` still-empty rows inside the unit of work, fix them,
    /// repeat until nothing matches.
    Paged,
    /// One unbounded query for all empty rows, then update them.
    Single,
}

impl FixStrategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paged" | "page" => Some(FixStrategy::Paged),
            "single" | "all" | "unpaged" => Some(FixStrategy::Single),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FixStrategy::Paged => "paged",
            FixStrategy::Single => "single",
        }
    }
}

#[derive(Clone, Debug)]
pub struct MigrateConfig {
    /// SQLite database file.
    /// Env: S2J_DATABASE
    pub database: Option<PathBuf>,

    /// Directory receiving serialized_to_json_validation.log.
    /// Env: S2J_LOG_DIR (default "var/log")
    pub log_dir: PathBuf,

    /// Rows per page for the validator scan and the paged fixer.
    /// Env: S2J_PAGE_SIZE (default 1000)
    pub page_size: u64,

    /// Env: S2J_FIX_STRATEGY = paged|single (default paged)
    pub fix_strategy: FixStrategy,

    /// Maximum number of violation lines kept in memory; None = all of them.
    /// Env: S2J_REPORT_MAX_LINES
    pub report_max_lines: Option<usize>,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            database: None,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            page_size: ROWS_PER_PAGE,
            fix_strategy: FixStrategy::Paged,
            report_max_lines: None,
        }
    }
}

impl MigrateConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as `from_env`, reading values through `get`.
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = get(ENV_DATABASE) {
            let s = v.trim();
            if !s.is_empty() {
                cfg.database = Some(PathBuf::from(s));
            }
        }

        if let Some(v) = get(ENV_LOG_DIR) {
            let s = v.trim();
            if !s.is_empty() {
                cfg.log_dir = PathBuf::from(s);
            }
        }

        if let Some(v) = get(ENV_PAGE_SIZE) {
            if let Ok(n) = v.trim().parse::<u64>() {
                if n > 0 {
                    cfg.page_size = n;
                }
            }
        }

        if let Some(v) = get(ENV_FIX_STRATEGY) {
            match FixStrategy::parse(&v) {
                Some(s) => cfg.fix_strategy = s,
                None => log::warn!(
                    "{}: unknown strategy '{}', keeping '{}'",
                    ENV_FIX_STRATEGY,
                    v.trim(),
                    cfg.fix_strategy.as_str()
                ),
            }
        }

        if let Some(v) = get(ENV_REPORT_MAX_LINES) {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.report_max_lines = Some(n);
            }
        }

        cfg
    }

    // Builder-style overrides.

    pub fn with_database<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database = Some(path.into());
        self
    }

    pub fn with_log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Zero is ignored: the scan always needs a positive page size.
    pub fn with_page_size(mut self, rows: u64) -> Self {
        if rows > 0 {
            self.page_size = rows;
        }
        self
    }

    pub fn with_fix_strategy(mut self, strategy: FixStrategy) -> Self {
        self.fix_strategy = strategy;
        self
    }

    pub fn with_report_max_lines(mut self, max: Option<usize>) -> Self {
        self.report_max_lines = max;
        self
    }

    /// Path of the validation report inside `log_dir`.
    pub fn report_path(&self) -> PathBuf {
        self.log_dir.join(crate::consts::REPORT_FILE_NAME)
    }
}

impl fmt::Display for MigrateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MigrateConfig {{ \
             database: {}, \
             log_dir: {}, \
             page_size: {}, \
             fix_strategy: {}, \
             report_max_lines: {} \
             }}",
            self.database
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "unset".to_string()),
            self.log_dir.display(),
            self.page_size,
            self.fix_strategy.as_str(),
            self.report_max_lines
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unlimited".to_string()),
        )
    }
}
