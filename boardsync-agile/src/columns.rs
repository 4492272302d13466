//! Board column layout.
//!
//! Turns the raw column configuration of a board into the column list that
//! records carry plus a status → column index table. Pure; no I/O.

use std::collections::HashMap;

use crate::client::RawColumn;

/// Name the remote service gives the backlog column.
pub const BACKLOG_COLUMN: &str = "Backlog";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnLayout {
    /// Names of the kept columns, in configuration order.
    pub columns: Vec<String>,
    /// Kept raw columns, aligned with `columns`.
    pub filtered: Vec<RawColumn>,
    /// Position of the `Backlog` column in the raw configuration.
    pub backlog_index: Option<usize>,
    pub has_backlog_column: bool,
    /// Whether the board's backlog listing should be fetched.
    pub should_fetch_backlog: bool,
    /// Normalized status id → index into `columns`.
    pub status_mapping: HashMap<String, usize>,
}

impl ColumnLayout {
    pub fn column_for(&self, status_id: &str) -> Option<usize> {
        self.status_mapping.get(status_id).copied()
    }

    /// Index into `columns` of the kanban column reported as the board
    /// backlog, wherever it sits. `None` when the backlog has no statuses.
    pub fn kanban_backlog_column(&self) -> Option<usize> {
        if !(self.has_backlog_column && self.should_fetch_backlog) {
            return None;
        }
        self.filtered.iter().rposition(|c| c.name == BACKLOG_COLUMN)
    }
}

/// Build the layout for a board.
///
/// A `Backlog` column is recorded but left out of scrum boards' columns
/// (scrum keeps its backlog as a separate list); kanban boards keep it.
/// Columns with no statuses are dropped. When a board has several columns
/// named `Backlog`, the last one wins.
pub fn build_columns(raw: &[RawColumn], is_scrum: bool) -> ColumnLayout {
    let mut layout = ColumnLayout::default();

    for (i, col) in raw.iter().enumerate() {
        if col.name == BACKLOG_COLUMN {
            layout.backlog_index = Some(i);
            layout.has_backlog_column = true;
            layout.should_fetch_backlog = !col.status_ids.is_empty();
            if is_scrum {
                continue;
            }
        }
        if col.status_ids.is_empty() {
            continue;
        }
        let index = layout.columns.len();
        for status in &col.status_ids {
            layout.status_mapping.insert(status.clone(), index);
        }
        layout.columns.push(col.name.clone());
        layout.filtered.push(col.clone());
    }

    // scrum boards without a Backlog column still have a backlog listing
    if is_scrum && !layout.has_backlog_column {
        layout.should_fetch_backlog = true;
    }
    layout
}
