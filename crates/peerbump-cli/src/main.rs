//! # peerbump-cli
//!
//! Bump npm dependencies without breaking peer dependency ranges.
//!
//! This is the entry point of the `peerbump` binary. It parses arguments,
//! sets up logging and the panic hook, and dispatches to the command handlers.

use std::process::ExitCode;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use peerbump_core::error::BumpError;
use tracing::{error, info};

mod commands;
mod output;

use commands::{CommandContext, CommandOutcome};
use output::errors::ErrorFormatter;

/// Update npm dependencies and fix the peer dependency conflicts it causes
#[derive(Parser)]
#[command(name = "peerbump", version, about = "Peer-aware dependency updates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply updates and every bump needed to keep peer ranges satisfied
    Update {
        #[command(flatten)]
        args: ResolveArgs,

        /// Print the outcome without writing package.json
        #[arg(long)]
        dry_run: bool,
    },
    /// Report the conflicts the updates would cause, without changing anything
    Check {
        #[command(flatten)]
        args: ResolveArgs,
    },
}

/// Arguments shared by `update` and `check`
#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Updates as `name@range`, e.g. `react@^18.2.0`
    #[arg(value_name = "PKG@RANGE", required = true)]
    pub packages: Vec<String>,

    /// Add packages that are not in the manifest yet as devDependencies
    #[arg(short = 'D', long = "dev")]
    pub dev: bool,

    /// Path to package.json (default: nearest one upwards from cwd)
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<Utf8PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Registry base URL
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,

    /// Resolve against a JSON file of packuments instead of the network
    #[arg(long, value_name = "PATH")]
    pub registry_fixture: Option<Utf8PathBuf>,

    /// How rewritten ranges are written: caret or preserve
    #[arg(long, value_name = "STYLE")]
    pub range_style: Option<String>,

    /// Consider prerelease versions when fixing conflicts
    #[arg(long)]
    pub allow_prerelease: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    info!("Starting peerbump v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            let formatter = ErrorFormatter::new();
            match err.downcast_ref::<BumpError>() {
                Some(bump) => eprintln!("{}", formatter.format_error(bump)),
                None => eprintln!("{}", formatter.format_simple(&format!("{:#}", err))),
            }
            ExitCode::from(2)
        },
    }
}

fn run_cli(cli: Cli) -> anyhow::Result<CommandOutcome> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

    rt.block_on(async {
        let ctx = CommandContext::new()?;
        Ok(commands::dispatch_command(cli.command, &ctx).await?)
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!(
                "peerbump={0},peerbump_config={0},peerbump_registry={0},peerbump_resolver={0}",
                level
            ))
        }))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("peerbump encountered an unexpected error: {}", panic_info);
        eprintln!("peerbump crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/peerbump/peerbump/issues");
        eprintln!("Error: {}", panic_info);
    }));
}
