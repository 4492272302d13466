pub mod board;
pub mod checkpoint;
pub mod export;
pub mod issue_boards;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use boardsync_agile::{Exporter, JsonLinesSink, RecordSink, StatsSnapshot, SyncError};
use boardsync_core::{config, ExportConfig, FileCheckpointStore};

use crate::http::UreqTransport;
use crate::GlobalArgs;

/// Load the config from `--config`, or from `~/.boardsync/config.yaml`.
pub fn load_config(global: &GlobalArgs) -> Result<ExportConfig> {
    let env_token = std::env::var(config::API_TOKEN_ENV).ok();
    match global.config.as_deref() {
        Some(path) => config::load_from(path, env_token)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => {
            let home = dirs::home_dir().context("could not determine home directory")?;
            config::load_at(&home, env_token)
                .context("failed to load config; create ~/.boardsync/config.yaml or pass --config")
        }
    }
}

pub fn open_store(cfg: &ExportConfig) -> Result<Arc<FileCheckpointStore>> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let state_dir = cfg.state_dir_at(&home);
    let store = FileCheckpointStore::open_at(&state_dir, &cfg.customer_id)
        .with_context(|| format!("failed to open checkpoint store in {}", state_dir.display()))?;
    Ok(Arc::new(store))
}

fn open_sink(output: Option<&Path>) -> Result<Arc<dyn RecordSink>> {
    Ok(match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create output file {}", path.display()))?;
            Arc::new(JsonLinesSink::new(BufWriter::new(file)))
        }
        None => Arc::new(JsonLinesSink::new(std::io::stdout())),
    })
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")
}

/// An exporter wired to the HTTP transport, the file checkpoint store and
/// the chosen output.
pub struct Session {
    pub exporter: Exporter,
    store: Arc<FileCheckpointStore>,
}

impl Session {
    pub fn open(cfg: &ExportConfig, output: Option<&Path>) -> Result<Self> {
        let store = open_store(cfg)?;
        let sink = open_sink(output)?;
        let transport = Arc::new(UreqTransport::from_config(cfg));
        let exporter = Exporter::from_config(cfg, transport, store.clone(), sink);
        Ok(Self { exporter, store })
    }

    /// Persist checkpoints, then surface the run result.
    pub fn finish<T>(self, result: Result<T, SyncError>) -> Result<T> {
        persist_checkpoints(&self.store, &result)?;
        result.context("export failed")
    }
}

/// Save the store unless the output may have lost records: a sprint marked
/// exported must have reached the output first.
fn persist_checkpoints<T>(store: &FileCheckpointStore, result: &Result<T, SyncError>) -> Result<()> {
    if let Err(err) = result {
        if err.is_sink_failure() {
            tracing::warn!(path = %store.path().display(), error = %err, "output failed; checkpoints not saved");
            return Ok(());
        }
    }
    store
        .flush()
        .with_context(|| format!("failed to save checkpoints to {}", store.path().display()))
}

#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "metric")]
    metric: &'static str,
    #[tabled(rename = "value")]
    value: u64,
}

/// Run summary on stderr.
pub fn print_summary(stats: &StatsSnapshot) {
    let rows = vec![
        StatsRow { metric: "boards", value: stats.boards },
        StatsRow { metric: "sprints", value: stats.sprints },
        StatsRow { metric: "kanbans", value: stats.kanbans },
        StatsRow { metric: "sprints skipped", value: stats.sprints_skipped },
        StatsRow { metric: "issues dropped", value: stats.issues_dropped },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    eprintln!(
        "{} in {:.1}s",
        "export finished".green().bold(),
        stats.duration_ms as f64 / 1000.0
    );
    eprintln!("{table}");
    if stats.issues_dropped > 0 {
        eprintln!(
            "{}",
            "some issues had no board column; rerun with --verbose for details".yellow()
        );
    }
}
