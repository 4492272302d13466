//! Export counters. Observability only; nothing reads them to make decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

#[derive(Debug)]
pub struct ExportStats {
    started: Instant,
    boards: AtomicU64,
    sprints: AtomicU64,
    kanbans: AtomicU64,
    sprints_skipped: AtomicU64,
    issues_dropped: AtomicU64,
}

/// Point-in-time copy of [`ExportStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub boards: u64,
    pub sprints: u64,
    pub kanbans: u64,
    pub sprints_skipped: u64,
    pub issues_dropped: u64,
    pub duration_ms: u64,
}

impl Default for ExportStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            boards: AtomicU64::new(0),
            sprints: AtomicU64::new(0),
            kanbans: AtomicU64::new(0),
            sprints_skipped: AtomicU64::new(0),
            issues_dropped: AtomicU64::new(0),
        }
    }

    pub fn inc_board(&self) {
        self.boards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sprint(&self) {
        self.sprints.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_kanban(&self) {
        self.kanbans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_sprints_skipped(&self, n: u64) {
        self.sprints_skipped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_issue_dropped(&self) {
        self.issues_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            boards: self.boards.load(Ordering::Relaxed),
            sprints: self.sprints.load(Ordering::Relaxed),
            kanbans: self.kanbans.load(Ordering::Relaxed),
            sprints_skipped: self.sprints_skipped.load(Ordering::Relaxed),
            issues_dropped: self.issues_dropped.load(Ordering::Relaxed),
            duration_ms: self.started.elapsed().as_millis() as u64,
        }
    }

    /// Log the run summary once.
    pub fn dump(&self) {
        let s = self.snapshot();
        tracing::info!(
            boards = s.boards,
            sprints = s.sprints,
            kanbans = s.kanbans,
            sprints_skipped = s.sprints_skipped,
            issues_dropped = s.issues_dropped,
            duration_ms = s.duration_ms,
            "export stats"
        );
    }
}
