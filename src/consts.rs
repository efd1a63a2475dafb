//! Constants shared by the validator, the fixer and the CLI.

/// Default page size for the validator scan (rows per SELECT).
pub const ROWS_PER_PAGE: u64 = 1000;

/// Report file name inside the log directory.
pub const REPORT_FILE_NAME: &str = "serialized_to_json_validation.log";

/// Default log directory (relative to the working directory).
pub const DEFAULT_LOG_DIR: &str = "var/log";

/// Violation reason for rows whose field is NULL / missing / "".
pub const EMPTY_VALUE_REASON: &str = "contains empty value";

/// Prefix of the final report line.
pub const SUMMARY_PREFIX: &str = "Invalid records count: ";

/// `json_decode`'s default nesting limit.
pub const JSON_MAX_DEPTH: usize = 512;

/// PHP's default `unserialize_max_depth`.
pub const UNSERIALIZE_MAX_DEPTH: usize = 4096;

// ----- ENV -----

pub const ENV_DATABASE: &str = "S2J_DATABASE";
pub const ENV_LOG_DIR: &str = "S2J_LOG_DIR";
pub const ENV_PAGE_SIZE: &str = "S2J_PAGE_SIZE";
pub const ENV_FIX_STRATEGY: &str = "S2J_FIX_STRATEGY";
pub const ENV_REPORT_MAX_LINES: &str = "S2J_REPORT_MAX_LINES";
