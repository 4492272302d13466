//! In-run sprint deduplication.
//!
//! A sprint is visible from every board whose filter matches its issues, so
//! several board tasks can list the same sprint id. The first task to claim
//! it materializes it; everyone else skips.

use std::collections::HashSet;
use std::sync::Mutex;

/// Sprint ids claimed so far in this export run. Never persisted.
#[derive(Debug, Default)]
pub struct SprintClaims {
    claimed: Mutex<HashSet<u64>>,
}

impl SprintClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically test-and-set `sprint_id`.
    ///
    /// Returns `true` if another caller already claimed it (skip), `false`
    /// if this caller now owns it (proceed).
    pub fn claim(&self, sprint_id: u64) -> bool {
        // a panicking holder cannot leave the set half-updated
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        !claimed.insert(sprint_id)
    }

    pub fn len(&self) -> usize {
        self.claimed.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
