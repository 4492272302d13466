//! Board discovery and fan-out.
//!
//! [`Exporter`] is the entry point: it lists boards, keeps the supported
//! ones, records them in the checkpoint store and runs one
//! [`board::export_board`] task per board on a bounded pool.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use boardsync_core::checkpoint::{get_string_list, project_board_list_key, BOARD_LIST_KEY};
use boardsync_core::{BoardType, CheckpointStore, ExportConfig};

use crate::board;
use crate::client::{AgileClient, BoardDescriptor};
use crate::dedup::SprintClaims;
use crate::error::SyncError;
use crate::membership::{self, SearchScope};
use crate::pool::WorkerPool;
use crate::sink::RecordSink;
use crate::stats::{ExportStats, StatsSnapshot};
use crate::transport::Transport;

/// Board id → project key for every board the listing returned, supported
/// or not. Sprints resolve their origin board through it.
pub type BoardDirectory = HashMap<u64, String>;

/// Per-customer knobs that do not change during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub customer_id: String,
    pub integration_instance_id: Option<String>,
    pub website_url: String,
    /// Re-export closed sprints that are already checkpointed.
    pub historical: bool,
    pub board_concurrency: usize,
    pub probe_concurrency: usize,
}

impl ExportSettings {
    pub fn from_config(cfg: &ExportConfig) -> Self {
        Self {
            customer_id: cfg.customer_id.clone(),
            integration_instance_id: cfg.integration_instance_id.clone(),
            website_url: cfg.website_url.clone(),
            historical: cfg.historical,
            board_concurrency: cfg.board_concurrency,
            probe_concurrency: cfg.probe_concurrency,
        }
    }
}

/// Everything a board task needs. Cheap to clone; one per run.
#[derive(Clone)]
pub struct ExportContext {
    pub client: Arc<AgileClient>,
    pub store: Arc<dyn CheckpointStore>,
    pub sink: Arc<dyn RecordSink>,
    pub stats: Arc<ExportStats>,
    pub claims: Arc<SprintClaims>,
    pub settings: Arc<ExportSettings>,
}

pub(crate) fn is_exportable(board: &BoardDescriptor) -> bool {
    BoardType::parse(&board.board_type).is_some() && !board.project_key.is_empty()
}

pub struct Exporter {
    client: Arc<AgileClient>,
    store: Arc<dyn CheckpointStore>,
    sink: Arc<dyn RecordSink>,
    settings: Arc<ExportSettings>,
}

impl Exporter {
    pub fn new(
        client: AgileClient,
        store: Arc<dyn CheckpointStore>,
        sink: Arc<dyn RecordSink>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            client: Arc::new(client),
            store,
            sink,
            settings: Arc::new(settings),
        }
    }

    pub fn from_config(
        cfg: &ExportConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CheckpointStore>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        let client = AgileClient::new(transport, cfg.customer_id.clone(), cfg.page_size);
        Self::new(client, store, sink, ExportSettings::from_config(cfg))
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Fresh dedup set and counters for one run.
    fn run_context(&self) -> ExportContext {
        ExportContext {
            client: Arc::clone(&self.client),
            store: Arc::clone(&self.store),
            sink: Arc::clone(&self.sink),
            stats: Arc::new(ExportStats::new()),
            claims: Arc::new(SprintClaims::new()),
            settings: Arc::clone(&self.settings),
        }
    }

    /// List boards newest first and split off the exportable ones.
    async fn discover(&self) -> Result<(Vec<BoardDescriptor>, Arc<BoardDirectory>), SyncError> {
        let mut boards = self.client.list_boards().await?;
        // newer boards have larger ids
        boards.sort_by(|a, b| b.id.cmp(&a.id));

        let directory: BoardDirectory = boards
            .iter()
            .map(|b| (b.id, b.project_key.clone()))
            .collect();

        let (exportable, skipped): (Vec<_>, Vec<_>) = boards.into_iter().partition(is_exportable);
        for b in &skipped {
            tracing::debug!(
                board = b.id,
                board_type = %b.board_type,
                project_key = %b.project_key,
                "skipping unsupported or orphaned board"
            );
        }
        Ok((exportable, Arc::new(directory)))
    }

    async fn fan_out(
        &self,
        ctx: &ExportContext,
        boards: Vec<BoardDescriptor>,
        directory: Arc<BoardDirectory>,
    ) -> Result<(), SyncError> {
        let ids: Vec<String> = boards.iter().map(|b| b.id.to_string()).collect();
        ctx.store.append_unique(BOARD_LIST_KEY, &ids)?;

        let mut pool = WorkerPool::new("board", self.settings.board_concurrency);
        for b in boards {
            let ctx = ctx.clone();
            let directory = Arc::clone(&directory);
            pool.spawn(async move { board::export_board(&ctx, &b, &directory).await });
        }
        let result = pool.join_all().await.map(|_| ());

        ctx.stats.dump();
        ctx.sink.flush()?;
        result
    }

    /// Full export: every supported board of the customer.
    pub async fn export_boards(&self) -> Result<StatsSnapshot, SyncError> {
        let ctx = self.run_context();
        let (boards, directory) = self.discover().await?;
        tracing::info!(
            boards = boards.len(),
            historical = self.settings.historical,
            "starting agile export"
        );
        self.fan_out(&ctx, boards, directory).await?;
        Ok(ctx.stats.snapshot())
    }

    /// Export only the given boards. Unknown ids fail with
    /// [`SyncError::BoardNotFound`]; unsupported boards are skipped.
    pub async fn export_selected(&self, board_ids: &[u64]) -> Result<StatsSnapshot, SyncError> {
        let ctx = self.run_context();
        let listed = self.client.list_boards().await?;
        let directory: BoardDirectory = listed
            .iter()
            .map(|b| (b.id, b.project_key.clone()))
            .collect();

        let mut selected = Vec::with_capacity(board_ids.len());
        for id in board_ids {
            let Some(b) = listed.iter().find(|b| b.id == *id) else {
                return Err(SyncError::BoardNotFound { board: *id });
            };
            if is_exportable(b) {
                selected.push(b.clone());
            } else {
                tracing::info!(board = b.id, board_type = %b.board_type, "board is not exportable; skipping");
            }
        }
        self.fan_out(&ctx, selected, Arc::new(directory)).await?;
        Ok(ctx.stats.snapshot())
    }

    pub async fn export_board_by_id(&self, board_id: u64) -> Result<StatsSnapshot, SyncError> {
        self.export_selected(&[board_id]).await
    }

    /// Probe checkpointed boards for `issue_key`. See [`membership::find_boards_for_issue`].
    pub async fn find_boards_for_issue(
        &self,
        issue_key: &str,
        scope: &SearchScope,
    ) -> Result<Vec<String>, SyncError> {
        membership::find_boards_for_issue(
            Arc::clone(&self.client),
            self.store.as_ref(),
            issue_key,
            scope,
            self.settings.probe_concurrency,
        )
        .await
    }

    /// Find the boards showing an issue: the project's boards first, then
    /// every other known board. With `reexport`, each board found is
    /// exported again so its records reflect the issue's current state.
    pub async fn update_issue_boards(
        &self,
        issue_key: &str,
        project_ref_id: Option<&str>,
        reexport: bool,
    ) -> Result<Vec<String>, SyncError> {
        let mut found = Vec::new();
        let mut probed = HashSet::new();
        if let Some(project) = project_ref_id {
            found = self
                .find_boards_for_issue(issue_key, &SearchScope::Project(project.to_string()))
                .await?;
            if found.is_empty() {
                probed = get_string_list(self.store.as_ref(), &project_board_list_key(project))?
                    .into_iter()
                    .collect();
            }
        }
        if found.is_empty() {
            found = self
                .find_boards_for_issue(issue_key, &SearchScope::All { ignore: probed })
                .await?;
        }
        tracing::info!(issue = %issue_key, boards = ?found, "resolved issue boards");

        if reexport && !found.is_empty() {
            let mut ids = Vec::with_capacity(found.len());
            for raw in &found {
                match raw.parse::<u64>() {
                    Ok(id) => ids.push(id),
                    Err(_) => tracing::warn!(board = %raw, "checkpointed board id is not numeric"),
                }
            }
            self.export_selected(&ids).await?;
        }
        Ok(found)
    }
}
