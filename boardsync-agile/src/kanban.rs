//! Kanban materialization: one record per kanban board.

use std::time::Instant;

use boardsync_core::{ids, Column, Kanban};

use crate::board::IssueRef;
use crate::client::{BoardDescriptor, IssueKind};
use crate::columns::ColumnLayout;
use crate::error::SyncError;
use crate::export::ExportContext;
use crate::urls;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedKanban {
    pub kanban: Kanban,
    /// Replacement for the board's backlog when the board has a backlog column.
    pub board_backlog: Option<Vec<String>>,
    pub members: Vec<IssueRef>,
}

/// Assign every issue of the board to its column.
///
/// Issues whose status maps to no column are logged and dropped. A backlog
/// column, wherever it sits, is taken out of the kanban and returned as
/// `board_backlog` so the backlog is not reported twice.
pub async fn materialize_kanban(
    ctx: &ExportContext,
    board: &BoardDescriptor,
    board_id: &str,
    layout: &ColumnLayout,
) -> Result<MaterializedKanban, SyncError> {
    let started = Instant::now();
    let settings = &ctx.settings;
    let mut columns: Vec<Column> = layout.filtered.iter().map(|c| Column::new(c.name.clone())).collect();

    let issues = ctx.client.fetch_board_issues(board.id, IssueKind::Issue).await?;
    let mut issue_ids = Vec::new();
    let mut project_ids: Vec<String> = Vec::new();
    let mut members = Vec::new();
    for issue in issues {
        let Some(index) = layout.column_for(&issue.status_id) else {
            tracing::error!(
                board = board.id,
                issue = %issue.ref_id,
                status = %issue.status_id,
                "no board column for issue status; dropping issue"
            );
            ctx.stats.inc_issue_dropped();
            continue;
        };
        columns[index].issue_ids.push(issue.id.clone());
        issue_ids.push(issue.id);
        if !project_ids.contains(&issue.project_id) {
            project_ids.push(issue.project_id);
        }
        members.push(IssueRef {
            ref_id: issue.ref_id,
            project_ref_id: issue.project_ref_id,
        });
    }

    let board_backlog = layout
        .kanban_backlog_column()
        .filter(|&i| i < columns.len())
        .map(|i| columns.remove(i).issue_ids);

    let ref_id = board.id.to_string();
    let kanban = Kanban {
        id: ids::kanban_id(&settings.customer_id, &ref_id),
        ref_id,
        customer_id: settings.customer_id.clone(),
        integration_instance_id: settings.integration_instance_id.clone(),
        board_id: board_id.to_string(),
        issue_ids,
        columns,
        project_ids,
        url: urls::board_url(&settings.website_url, board.id, &board.project_key),
        active: true,
    };
    tracing::info!(
        board = board.id,
        issues = kanban.issue_ids.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "fetched kanban"
    );
    Ok(MaterializedKanban {
        kanban,
        board_backlog,
        members,
    })
}
