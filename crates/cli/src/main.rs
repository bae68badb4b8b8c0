//! diskmemo command line interface

mod cli;
mod commands;
mod tracing;

use crate::cli::parse;
use crate::commands::Command;
use crate::tracing::{TracingConfig, TracingFormat};
use diskmemo_cache::settings::resolve_cache_dir;
use miette::IntoDiagnostic;
use std::io::Write;

fn main() -> miette::Result<()> {
    let cli = parse();

    let format = if cli.json {
        TracingFormat::Json
    } else {
        cli.log_format
    };
    crate::tracing::init_tracing(TracingConfig {
        format,
        level: cli.level.into(),
        filter: cli.log_filter,
    })?;

    let command: Command = cli.command.into();
    let root = match (&command, cli.cache_dir) {
        (_, Some(dir)) => dir,
        // `key` never touches the filesystem.
        (Command::Key { .. }, None) => std::path::PathBuf::new(),
        (_, None) => resolve_cache_dir()?,
    };
    ::tracing::debug!(root = %root.display(), command = command.name(), "running command");

    let output = commands::execute(command, &root, cli.format)?;
    if !output.is_empty() {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{output}").into_diagnostic()?;
    }
    Ok(())
}
