//! Packsafe CLI - validate, extract and process untrusted asset packs.

mod cli;
mod commands;
mod error;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;
use cli::Commands;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    if let Commands::Completion(args) = &cli.command {
        commands::completion::execute(args.shell);
        return Ok(());
    }

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);
    let events = commands::event_log(cli.audit_log.as_deref())?;
    let interactive = !cli.json && !cli.quiet;

    match &cli.command {
        Commands::Validate(args) => commands::validate::execute(args, events, &*formatter),
        Commands::Extract(args) => {
            commands::extract::execute(args, events, &*formatter, interactive)
        }
        Commands::Run(args) => commands::run::execute(args, events, &*formatter, !cli.json),
        Commands::CheckPath(args) => commands::check_path::execute(&args.path, events, &*formatter),
        Commands::Completion(_) => Ok(()),
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
///
/// `RUST_LOG` wins unless `--verbose` or `--quiet` is given.
fn init_tracing(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
