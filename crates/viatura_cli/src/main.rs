//! `viatura` command-line entry point.
//!
//! # Responsibility
//! - Parse flags, resolve config and logging, open the fleet database.
//! - Hand the parsed command to `commands::run`.

mod args;
mod commands;
mod settings;

use anyhow::{Context, Result};
use args::CommandLine;
use log::info;
use viatura_core::{default_log_level, init_logging, open_db};

fn main() -> Result<()> {
    let cli = CommandLine::parse_args();
    let config = settings::resolve_config(&cli)?;

    let log_dir = settings::resolve_log_dir(cli.log_dir.as_deref())?;
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    // Logging failures must not block the command itself.
    if let Err(err) = init_logging(level, &log_dir.to_string_lossy()) {
        eprintln!("warning: file logging disabled: {err}");
    }

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database {:?}", cli.db))?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        viatura_core::core_version()
    );
    commands::run(&cli, &conn, config)
}
