//! cloudlift: move Terraform working directories from the legacy remote
//! backend to the `cloud` block.
//!
//! # Usage
//!
//! ```text
//! cloudlift migrate [-d DIR]... [--manifest FILE] [--hostname HOST] [--token TOKEN]
//!                   [--no-dry-run] [--backup] [--terraform PATH] [--json]
//! cloudlift diff [-d DIR]... [--manifest FILE] [--hostname HOST]
//! ```
//!
//! `migrate` is a dry run unless `--no-dry-run` is given.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, migrate::MigrateArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "cloudlift",
    version,
    about = "Migrate Terraform configurations from the remote backend to the cloud block",
    long_about = None,
)]
struct Cli {
    /// Log progress at info level (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite legacy backend blocks and re-initialise each directory.
    Migrate(MigrateArgs),

    /// Show a unified diff of what migrate would change.
    Diff(DiffArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Migrate(args) => args.run(),
        Commands::Diff(args) => args.run(),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
