//! Bounded worker pool.
//!
//! Tasks are spawned eagerly onto a [`JoinSet`] and each waits for a
//! semaphore permit before doing any work, so at most `width` run at once.
//! A failing task does not cancel its siblings: [`WorkerPool::join_all`]
//! drains every task, returns the first error in completion order and logs
//! the rest.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::SyncError;

pub struct WorkerPool<T> {
    name: &'static str,
    width: usize,
    permits: Arc<Semaphore>,
    tasks: JoinSet<Result<T, SyncError>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// `width` is clamped to at least 1.
    pub fn new(name: &'static str, width: usize) -> Self {
        let width = width.max(1);
        Self {
            name,
            width,
            permits: Arc::new(Semaphore::new(width)),
            tasks: JoinSet::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<T, SyncError>> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let name = self.name;
        self.tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| SyncError::Task(format!("{name} pool closed: {e}")))?;
            task.await
        });
    }

    /// Wait for every task. Successful outputs come back in completion order.
    pub async fn join_all(mut self) -> Result<Vec<T>, SyncError> {
        let mut outputs = Vec::with_capacity(self.tasks.len());
        let mut first_error: Option<SyncError> = None;

        while let Some(joined) = self.tasks.join_next().await {
            let result = match joined {
                Ok(inner) => inner,
                Err(err) => Err(SyncError::Task(format!(
                    "{} task join failure: {err}",
                    self.name
                ))),
            };
            match result {
                Ok(value) => outputs.push(value),
                Err(err) if first_error.is_none() => {
                    tracing::debug!(pool = self.name, error = %err, "first task failure");
                    first_error = Some(err);
                }
                Err(err) => {
                    tracing::error!(pool = self.name, error = %err, "additional task failure");
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(outputs),
        }
    }
}
