//! Sprint resolution and materialization for scrum boards.

use std::time::Instant;

use boardsync_core::checkpoint::sprint_key;
use boardsync_core::{ids, CheckpointStore, Column, Sprint, SprintStatus};

use crate::board::IssueRef;
use crate::client::AgileClient;
use crate::columns::ColumnLayout;
use crate::error::SyncError;
use crate::export::{BoardDirectory, ExportContext};
use crate::urls;

/// Sprint ids of a board in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SprintQueue {
    /// Future and active sprints first, then closed ones; remote order within each.
    pub ids: Vec<u64>,
    /// Closed sprints left out because a previous run already exported them.
    pub skipped: usize,
}

/// List a board's sprints, dropping closed sprints that carry a
/// `sprint_<id>` checkpoint unless `historical` is set.
pub async fn list_sprint_ids(
    client: &AgileClient,
    board_id: u64,
    historical: bool,
    store: &dyn CheckpointStore,
) -> Result<SprintQueue, SyncError> {
    let sprints = client.list_sprints(board_id).await?;

    let mut open = Vec::new();
    let mut closed = Vec::new();
    let mut skipped = 0;
    for s in sprints {
        let is_closed = SprintStatus::parse(&s.state).map_or(false, SprintStatus::is_closed);
        if is_closed && !historical && store.exists(&sprint_key(s.id))? {
            tracing::debug!(board = board_id, sprint = s.id, "skipping sprint already exported");
            skipped += 1;
            continue;
        }
        if is_closed {
            closed.push(s.id);
        } else {
            open.push(s.id);
        }
    }
    open.extend(closed);
    Ok(SprintQueue { ids: open, skipped })
}

/// A sprint record plus the issues that were placed in its columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedSprint {
    pub sprint: Sprint,
    pub members: Vec<IssueRef>,
}

/// Build the record for one sprint, exported through the board whose
/// normalized id is `board_id`.
///
/// Returns `Ok(None)` when the sprint's origin board has no project key in
/// `directory` (deleted or orphaned board).
pub async fn materialize_sprint(
    ctx: &ExportContext,
    sprint_id: u64,
    board_id: &str,
    directory: &BoardDirectory,
    layout: &ColumnLayout,
) -> Result<Option<MaterializedSprint>, SyncError> {
    let started = Instant::now();
    let settings = &ctx.settings;
    let detail = ctx.client.fetch_sprint_detail(sprint_id).await?;

    let project_key = match directory.get(&detail.origin_board_id) {
        Some(key) if !key.is_empty() => key.clone(),
        _ => {
            tracing::debug!(
                sprint = sprint_id,
                name = %detail.name,
                origin_board = detail.origin_board_id,
                "skipping sprint whose origin board cannot be resolved"
            );
            return Ok(None);
        }
    };

    let status = SprintStatus::parse(&detail.state).ok_or_else(|| SyncError::InvalidSprintState {
        sprint: sprint_id,
        state: detail.state.clone(),
    })?;

    let issues = ctx.client.fetch_sprint_issues(sprint_id).await?;

    let mut goal = detail.goal;
    let mut columns: Vec<Column> = layout.columns.iter().map(Column::new).collect();
    let mut issue_ids = Vec::new();
    let mut project_ids: Vec<String> = Vec::new();
    let mut members = Vec::new();
    for issue in issues {
        if goal.is_empty() && !issue.goal.is_empty() {
            goal = issue.goal.clone();
        }
        let Some(index) = layout.column_for(&issue.status_id) else {
            continue;
        };
        issue_ids.push(issue.id.clone());
        columns[index].issue_ids.push(issue.id);
        if !project_ids.contains(&issue.project_id) {
            project_ids.push(issue.project_id);
        }
        members.push(IssueRef {
            ref_id: issue.ref_id,
            project_ref_id: issue.project_ref_id,
        });
    }

    let url = if status.is_closed() {
        urls::completed_sprint_url(&settings.website_url, detail.origin_board_id, &project_key, sprint_id)
    } else {
        urls::board_url(&settings.website_url, detail.origin_board_id, &project_key)
    };

    let ref_id = sprint_id.to_string();
    let sprint = Sprint {
        id: ids::sprint_id(&settings.customer_id, &ref_id),
        ref_id,
        customer_id: settings.customer_id.clone(),
        integration_instance_id: settings.integration_instance_id.clone(),
        name: detail.name,
        goal,
        status,
        started_date: detail.start_date,
        ended_date: detail.end_date,
        completed_date: detail.complete_date,
        board_id: board_id.to_string(),
        project_ids,
        issue_ids,
        columns,
        url,
        active: true,
    };
    tracing::info!(
        sprint = sprint_id,
        status = %status,
        issues = sprint.issue_ids.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "fetched sprint"
    );
    Ok(Some(MaterializedSprint { sprint, members }))
}
