//! Board-membership fallback search.
//!
//! When the only thing known about an issue is its key, the boards that show
//! it are found by probing each checkpointed board with a one-result search.

use std::collections::HashSet;
use std::sync::Arc;

use boardsync_core::checkpoint::{get_string_list, project_board_list_key, BOARD_LIST_KEY};
use boardsync_core::CheckpointStore;

use crate::client::AgileClient;
use crate::error::SyncError;
use crate::pool::WorkerPool;

/// Which checkpointed boards to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    /// Boards recorded under `projectboardlist:<project ref id>`.
    Project(String),
    /// Every board in `boardlist` except `ignore`.
    All { ignore: HashSet<String> },
}

fn candidates(store: &dyn CheckpointStore, scope: &SearchScope) -> Result<Vec<String>, SyncError> {
    Ok(match scope {
        SearchScope::Project(project) => get_string_list(store, &project_board_list_key(project))?,
        SearchScope::All { ignore } => get_string_list(store, BOARD_LIST_KEY)?
            .into_iter()
            .filter(|b| !ignore.contains(b))
            .collect(),
    })
}

/// Probe the candidate boards concurrently (at most `width` at a time) and
/// return the ones that show `issue_key`, in candidate order.
///
/// Empty when nothing has been checkpointed for the scope yet.
pub async fn find_boards_for_issue(
    client: Arc<AgileClient>,
    store: &dyn CheckpointStore,
    issue_key: &str,
    scope: &SearchScope,
    width: usize,
) -> Result<Vec<String>, SyncError> {
    let boards = candidates(store, scope)?;
    if boards.is_empty() {
        tracing::debug!(issue = %issue_key, scope = ?scope, "no checkpointed boards to probe");
        return Ok(Vec::new());
    }

    let mut pool = WorkerPool::new("probe", width);
    for (position, board) in boards.iter().cloned().enumerate() {
        let client = Arc::clone(&client);
        let issue_key = issue_key.to_string();
        pool.spawn(async move {
            let present = client.probe_board_membership(&board, &issue_key).await?;
            Ok((position, present))
        });
    }
    let mut answers = pool.join_all().await?;
    answers.sort_by_key(|(position, _)| *position);

    let found: Vec<String> = answers
        .into_iter()
        .filter(|(_, present)| *present)
        .map(|(position, _)| boards[position].clone())
        .collect();
    tracing::debug!(issue = %issue_key, probed = boards.len(), found = found.len(), "board membership probe done");
    Ok(found)
}
