//! Per-board export.
//!
//! Order of work for one board:
//! 1. column configuration → [`build_columns`]
//! 2. backlog listing, when the layout asks for it
//! 3. scrum: every sprint (open first, then closed); kanban: one kanban record
//! 4. the board record itself, always after its children

use std::time::Instant;

use chrono::Utc;
use serde_json::Value;

use boardsync_core::checkpoint::{issue_board_key, project_board_list_key, sprint_key};
use boardsync_core::{ids, Board, BoardType, CheckpointError, CheckpointStore, Record};

use crate::client::{BoardDescriptor, IssueKind};
use crate::columns::{build_columns, ColumnLayout};
use crate::error::SyncError;
use crate::export::{BoardDirectory, ExportContext};
use crate::kanban::materialize_kanban;
use crate::sprint::{list_sprint_ids, materialize_sprint};
use crate::urls;

/// Remote ids of an issue placed on a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub ref_id: String,
    pub project_ref_id: String,
}

/// Record that `board_ref_id` shows each issue in `members`, and that each
/// of their projects has this board.
pub fn record_associations(
    store: &dyn CheckpointStore,
    board_ref_id: &str,
    members: &[IssueRef],
) -> Result<(), CheckpointError> {
    let board = [board_ref_id.to_string()];
    let mut projects: Vec<&str> = Vec::new();
    for m in members {
        store.append_unique(&issue_board_key(&m.ref_id), &board)?;
        if !m.project_ref_id.is_empty() && !projects.contains(&m.project_ref_id.as_str()) {
            projects.push(&m.project_ref_id);
        }
    }
    for project in projects {
        store.append_unique(&project_board_list_key(project), &board)?;
    }
    Ok(())
}

/// Export one board and its sprints or kanban.
///
/// Unsupported and orphaned boards are skipped before any request. Any
/// failure is wrapped with the board id.
pub async fn export_board(
    ctx: &ExportContext,
    board: &BoardDescriptor,
    directory: &BoardDirectory,
) -> Result<(), SyncError> {
    let Some(board_type) = BoardType::parse(&board.board_type) else {
        tracing::debug!(board = board.id, board_type = %board.board_type, "unsupported board type");
        return Ok(());
    };
    if board.project_key.is_empty() {
        tracing::debug!(board = board.id, "orphaned board has no project key");
        return Ok(());
    }
    let started = Instant::now();
    run(ctx, board, board_type, directory)
        .await
        .map_err(|e| SyncError::for_board(board.id, e))?;
    tracing::info!(
        board = board.id,
        board_type = %board_type,
        duration_ms = started.elapsed().as_millis() as u64,
        "exported board"
    );
    Ok(())
}

async fn run(
    ctx: &ExportContext,
    board: &BoardDescriptor,
    board_type: BoardType,
    directory: &BoardDirectory,
) -> Result<(), SyncError> {
    let settings = &ctx.settings;
    let board_ref = board.id.to_string();
    let board_id = ids::board_id(&settings.customer_id, &board_ref);

    let raw_columns = ctx.client.fetch_board_config(board.id).await?;
    let layout = build_columns(&raw_columns, board_type == BoardType::Scrum);

    let mut backlog_issue_ids = Vec::new();
    if layout.should_fetch_backlog {
        backlog_issue_ids = ctx
            .client
            .fetch_board_issues(board.id, IssueKind::Backlog)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();
    } else {
        tracing::debug!(board = board.id, "skipping backlog for board");
    }

    if !board.project_ref_id.is_empty() {
        ctx.store.append_unique(
            &project_board_list_key(&board.project_ref_id),
            std::slice::from_ref(&board_ref),
        )?;
    }

    match board_type {
        BoardType::Scrum => export_sprints(ctx, board, &board_id, directory, &layout).await?,
        BoardType::Kanban => {
            let materialized = materialize_kanban(ctx, board, &board_id, &layout).await?;
            if let Some(backlog) = materialized.board_backlog {
                backlog_issue_ids = backlog;
            }
            record_associations(ctx.store.as_ref(), &board_ref, &materialized.members)?;
            ctx.sink.emit(&Record::Kanban(materialized.kanban))?;
            ctx.stats.inc_kanban();
        }
    }

    let record = Board {
        id: board_id,
        ref_id: board_ref,
        customer_id: settings.customer_id.clone(),
        integration_instance_id: settings.integration_instance_id.clone(),
        name: board.name.clone(),
        board_type,
        project_key: board.project_key.clone(),
        project_id: ids::project_id(&settings.customer_id, &board.project_ref_id),
        columns: layout.columns,
        backlog_issue_ids,
        url: urls::board_url(&settings.website_url, board.id, &board.project_key),
        active: true,
    };
    ctx.sink.emit(&Record::Board(record))?;
    ctx.stats.inc_board();
    Ok(())
}

async fn export_sprints(
    ctx: &ExportContext,
    board: &BoardDescriptor,
    board_id: &str,
    directory: &BoardDirectory,
    layout: &ColumnLayout,
) -> Result<(), SyncError> {
    let board_ref = board.id.to_string();
    let queue = list_sprint_ids(
        &ctx.client,
        board.id,
        ctx.settings.historical,
        ctx.store.as_ref(),
    )
    .await?;
    ctx.stats.add_sprints_skipped(queue.skipped as u64);

    for sprint_id in queue.ids {
        if ctx.claims.claim(sprint_id) {
            // another board emits the sprint; this board still records
            // which of the sprint's issues it shows
            tracing::debug!(board = board.id, sprint = sprint_id, "sprint claimed by another board");
            let members: Vec<IssueRef> = ctx
                .client
                .fetch_sprint_issues(sprint_id)
                .await?
                .into_iter()
                .filter(|i| layout.column_for(&i.status_id).is_some())
                .map(|i| IssueRef {
                    ref_id: i.ref_id,
                    project_ref_id: i.project_ref_id,
                })
                .collect();
            record_associations(ctx.store.as_ref(), &board_ref, &members)?;
            continue;
        }

        let Some(materialized) = materialize_sprint(ctx, sprint_id, board_id, directory, layout).await?
        else {
            continue;
        };
        record_associations(ctx.store.as_ref(), &board_ref, &materialized.members)?;
        let closed = materialized.sprint.status.is_closed();
        ctx.sink.emit(&Record::Sprint(materialized.sprint))?;
        ctx.stats.inc_sprint();
        if closed {
            ctx.store
                .set(&sprint_key(sprint_id), Value::from(Utc::now().timestamp_millis()))?;
        }
    }
    Ok(())
}
