use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, Write};

use crate::config::MigrateConfig;
use crate::FieldTarget;

pub mod migrate;

pub use migrate::{cmd_empty_values_fix, cmd_validate};

#[derive(Parser, Debug)]
#[command(
    name = "s2j",
    version,
    about = "Validate and patch serialized columns before a serialized-to-JSON migration",
    long_about = "Validate and patch serialized columns before a serialized-to-JSON migration.\n\n\
                  The database and the rest of the settings come from the environment:\n\
                  S2J_DATABASE, S2J_LOG_DIR, S2J_PAGE_SIZE, S2J_FIX_STRATEGY, S2J_REPORT_MAX_LINES.",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

/// Positional arguments shared by both commands.
#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// Table name
    pub table: String,
    /// Identifier field name
    pub id_field: String,
    /// Field to be validated
    pub field: String,
}

impl From<TargetArgs> for FieldTarget {
    fn from(a: TargetArgs) -> Self {
        FieldTarget::new(&a.table, &a.id_field, &a.field)
    }
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Replace '' in the field with the serialized empty string (one transaction).
    #[command(alias = "serialized-to-json:empty-values-fix")]
    EmptyValuesFix(TargetArgs),

    /// Report rows whose field is neither JSON nor PHP-serialized.
    #[command(alias = "serialized-to-json:validate")]
    Validate(TargetArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = MigrateConfig::from_env();
    log::debug!("{}", cfg);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    dispatch(cli.cmd, &cfg, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Run one parsed command against `cfg`, writing user-facing lines to `out`.
pub fn dispatch(cmd: Cmd, cfg: &MigrateConfig, out: &mut dyn Write) -> Result<()> {
    match cmd {
        Cmd::EmptyValuesFix(args) => {
            cmd_empty_values_fix(cfg, &FieldTarget::from(args), out)?;
        }
        Cmd::Validate(args) => {
            cmd_validate(cfg, &FieldTarget::from(args), out)?;
        }
    }
    Ok(())
}

/// Parse argv-style input without touching the process environment (tests, embedding).
pub fn parse_from<I, T>(args: I) -> Result<Cmd>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    Ok(cli.cmd)
}
