//! `boardsync board <id>` — export one board.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::{load_config, print_summary, runtime, Session};
use crate::GlobalArgs;

#[derive(Args, Debug)]
pub struct BoardArgs {
    /// Remote board id.
    pub id: u64,

    /// Re-export closed sprints that earlier runs already exported.
    #[arg(long)]
    pub historical: bool,

    /// Write records to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl BoardArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let mut cfg = load_config(global)?;
        cfg.historical |= self.historical;

        let session = Session::open(&cfg, self.output.as_deref())?;
        let result = runtime()?.block_on(session.exporter.export_board_by_id(self.id));
        let stats = session.finish(result)?;
        print_summary(&stats);
        Ok(())
    }
}
