//! `boardsync issue-boards <KEY>` — which boards show an issue.
//!
//! Probes the boards recorded by earlier exports: the project's boards
//! first (with `--project`), then every other known board.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::{load_config, runtime, Session};
use crate::GlobalArgs;

#[derive(Args, Debug)]
pub struct IssueBoardsArgs {
    /// Issue key, e.g. APP-123.
    pub key: String,

    /// Remote id of the issue's project; its boards are probed first.
    #[arg(long)]
    pub project: Option<String>,

    /// Export every board found again.
    #[arg(long)]
    pub reexport: bool,

    /// Where re-exported records go (stdout when omitted).
    #[arg(short, long, requires = "reexport")]
    pub output: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct IssueBoardsJson<'a> {
    issue: &'a str,
    boards: &'a [String],
}

impl IssueBoardsArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let cfg = load_config(global)?;
        let session = Session::open(&cfg, self.output.as_deref())?;
        let result = runtime()?.block_on(session.exporter.update_issue_boards(
            &self.key,
            self.project.as_deref(),
            self.reexport,
        ));
        let boards = session.finish(result)?;

        if self.json {
            let payload = IssueBoardsJson {
                issue: &self.key,
                boards: &boards,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize issue boards JSON")?
            );
            return Ok(());
        }

        // with --reexport and no --output, stdout carries records
        let report = if boards.is_empty() {
            format!("{} is not on any known board", self.key.bold())
        } else {
            format!("{} is on boards: {}", self.key.bold(), boards.join(", ").green())
        };
        if self.reexport && self.output.is_none() {
            eprintln!("{report}");
        } else {
            println!("{report}");
        }
        Ok(())
    }
}
