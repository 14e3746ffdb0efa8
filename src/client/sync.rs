use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::Notifier;
use super::api::PlannerApi;
use super::store::Store;
use crate::errors::ClientError;
use crate::models::TaskId;

/// Optimistic task status updates.
///
/// A toggle writes the new flag into the store immediately, persists it with
/// one API call, and on failure writes the previous flag back. There are no
/// retries, and two toggles of the same task in flight at once are not
/// ordered against each other.
#[derive(Clone)]
pub struct TaskSync {
    store: Store,
    api: Arc<dyn PlannerApi>,
    notifier: Arc<dyn Notifier>,
}

impl TaskSync {
    pub fn new(store: Store, api: Arc<dyn PlannerApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            api,
            notifier,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Write `completed` into the store right away. Returns the previous
    /// flag, which [`finish`](Self::finish) restores if the update fails.
    pub fn begin(&self, id: &TaskId, completed: bool) -> Result<bool, ClientError> {
        self.store
            .set_task_completed(id, completed)
            .ok_or_else(|| not_found(id))
    }

    /// Invert the stored flag right away. Returns the previous flag.
    pub fn begin_flip(&self, id: &TaskId) -> Result<bool, ClientError> {
        self.store.flip_task_completed(id).ok_or_else(|| not_found(id))
    }

    /// Set `id`'s completion flag. Returns the flag the server stored.
    pub async fn toggle(
        &self,
        id: &TaskId,
        completed: bool,
        scope: &CancellationToken,
    ) -> Result<bool, ClientError> {
        if scope.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        let previous = self.begin(id, completed)?;
        self.finish(id, completed, previous, scope).await
    }

    /// Persist a flag already written by [`begin`](Self::begin), then
    /// confirm it or restore `previous`.
    ///
    /// If `scope` is cancelled before the response arrives, the response is
    /// dropped and the store is left as it is: neither confirmed nor reverted.
    pub async fn finish(
        &self,
        id: &TaskId,
        completed: bool,
        previous: bool,
        scope: &CancellationToken,
    ) -> Result<bool, ClientError> {
        let result = tokio::select! {
            biased;
            _ = scope.cancelled() => {
                tracing::debug!(task_id = %id, "View closed before task update finished");
                return Err(ClientError::Cancelled);
            }
            result = self.api.update_task_status(id, completed) => result,
        };

        match result {
            Ok(stored) => {
                if stored != completed {
                    tracing::warn!(
                        task_id = %id,
                        requested = completed,
                        stored,
                        "Server stored a different flag than requested"
                    );
                }
                self.store.set_task_completed(id, stored);
                Ok(stored)
            }
            Err(e) => {
                if self.store.set_task_completed(id, previous).is_none() {
                    tracing::warn!(
                        task_id = %id,
                        "Task left the list before its update could be reverted"
                    );
                }
                tracing::warn!(task_id = %id, error = %e, "Task update failed, reverted");
                self.notifier
                    .alert(&format!("Failed to update task: {}", e.user_message()));
                Err(e)
            }
        }
    }
}

fn not_found(id: &TaskId) -> ClientError {
    tracing::error!(task_id = %id, "Task not found in current task list");
    ClientError::TaskNotFound { id: id.clone() }
}
