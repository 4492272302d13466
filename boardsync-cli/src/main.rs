//! boardsync — export agile boards, sprints and kanbans as a record stream.
//!
//! # Usage
//!
//! ```text
//! boardsync export [--historical] [--output <file>]
//! boardsync board <id> [--historical] [--output <file>]
//! boardsync issue-boards <KEY> [--project <id>] [--reexport] [--json]
//! boardsync checkpoint list [--json]
//! boardsync checkpoint clear
//! ```
//!
//! Records go to stdout (or `--output`) as JSON Lines; logs and summaries go
//! to stderr.

mod commands;
mod http;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use commands::{
    board::BoardArgs, checkpoint::CheckpointCommand, export::ExportArgs,
    issue_boards::IssueBoardsArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "boardsync",
    version,
    about = "Sync agile boards, sprints and kanbans into a JSON Lines record stream",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags accepted by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Config file to use instead of ~/.boardsync/config.yaml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON objects.
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export every supported board of the configured customer.
    Export(ExportArgs),

    /// Export a single board by its remote id.
    Board(BoardArgs),

    /// Find which boards show an issue.
    IssueBoards(IssueBoardsArgs),

    /// Inspect or reset the checkpoint store.
    Checkpoint {
        #[command(subcommand)]
        command: CheckpointCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose, cli.global.log_json);
    match cli.command {
        Commands::Export(args) => args.run(&cli.global),
        Commands::Board(args) => args.run(&cli.global),
        Commands::IssueBoards(args) => args.run(&cli.global),
        Commands::Checkpoint { command } => commands::checkpoint::run(command, &cli.global),
    }
}

/// Logs go to stderr; stdout carries the record stream.
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
