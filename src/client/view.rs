use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::categories::{self, CategoryFilter, CategoryGroup, Progress};
use super::sync::TaskSync;
use crate::errors::ClientError;
use crate::models::{Task, TaskId};

/// A background task update; resolves to the flag the server stored.
pub type PendingUpdate = JoinHandle<Result<bool, ClientError>>;

/// The task list of the current project, as one screen.
///
/// Owns a [`CancellationToken`]; status updates started from the view stop
/// applying their results once the view is closed or dropped.
pub struct TaskView {
    sync: TaskSync,
    scope: CancellationToken,
    filter: CategoryFilter,
}

impl TaskView {
    pub fn new(sync: TaskSync) -> Self {
        Self {
            sync,
            scope: CancellationToken::new(),
            filter: CategoryFilter::All,
        }
    }

    pub fn filter(&self) -> CategoryFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: CategoryFilter) {
        self.filter = filter;
    }

    /// Tasks passing the current filter, in list order.
    pub fn visible_tasks(&self) -> Vec<Task> {
        let tasks = self.sync.store().tasks();
        categories::filter_tasks(&tasks, self.filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Calls `f` with the grouped task list. Groups borrow from a snapshot
    /// taken for the duration of the call.
    pub fn with_groups<R>(&self, f: impl FnOnce(&[CategoryGroup<'_>]) -> R) -> R {
        let tasks = self.sync.store().tasks();
        let visible: Vec<Task> = categories::filter_tasks(&tasks, self.filter)
            .into_iter()
            .cloned()
            .collect();
        let groups = categories::group_by_category(&visible);
        f(&groups)
    }

    pub fn progress(&self) -> Progress {
        categories::overall_progress(&self.sync.store().tasks())
    }

    /// Set a task's flag. The store changes before this returns; the
    /// request runs in the background.
    pub fn set_completed(&self, id: TaskId, completed: bool) -> Result<PendingUpdate, ClientError> {
        self.ensure_open()?;
        let previous = self.sync.begin(&id, completed)?;
        Ok(self.spawn_finish(id, completed, previous))
    }

    /// Flip a task's flag. The store changes before this returns, so a
    /// second toggle sees the first one's result.
    pub fn toggle(&self, id: TaskId) -> Result<PendingUpdate, ClientError> {
        self.ensure_open()?;
        let previous = self.sync.begin_flip(&id)?;
        Ok(self.spawn_finish(id, !previous, previous))
    }

    fn ensure_open(&self) -> Result<(), ClientError> {
        if self.scope.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        Ok(())
    }

    fn spawn_finish(&self, id: TaskId, completed: bool, previous: bool) -> PendingUpdate {
        let sync = self.sync.clone();
        let scope = self.scope.child_token();
        tokio::spawn(async move { sync.finish(&id, completed, previous, &scope).await })
    }

    /// Stop applying results of in-flight updates.
    pub fn close(&self) {
        self.scope.cancel();
    }
}

impl Drop for TaskView {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}
