//! `boardsync export` — full board discovery and export.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::{load_config, print_summary, runtime, Session};
use crate::GlobalArgs;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Re-export closed sprints that earlier runs already exported.
    #[arg(long)]
    pub historical: bool,

    /// Write records to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ExportArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let mut cfg = load_config(global)?;
        cfg.historical |= self.historical;

        let session = Session::open(&cfg, self.output.as_deref())?;
        let result = runtime()?.block_on(session.exporter.export_boards());
        let stats = session.finish(result)?;
        print_summary(&stats);
        Ok(())
    }
}
