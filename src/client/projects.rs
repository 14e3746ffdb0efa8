//! Loading projects and their tasks into the client store.

use super::View;
use super::api::PlannerApi;
use super::store::Store;
use crate::errors::ClientError;

/// Fetch the project list and the current-project pointer.
pub async fn refresh_projects(api: &dyn PlannerApi, store: &Store) -> Result<usize, ClientError> {
    store.set_loading(true);
    let result = api.list_projects().await;
    store.set_loading(false);

    let list = result.inspect_err(|e| store.set_error(Some(e.user_message())))?;
    let count = list.projects.len();
    store.set_projects(list.projects, list.current_project_id);
    tracing::debug!(count, "Loaded projects");
    Ok(count)
}

/// Load a project with its tasks and make it current.
pub async fn open_project(
    api: &dyn PlannerApi,
    store: &Store,
    project_id: i64,
) -> Result<View, ClientError> {
    store.set_loading(true);
    store.clear_tasks();
    let result = api.get_project(project_id).await;
    store.set_loading(false);

    let detail = match result {
        Ok(detail) => detail,
        Err(e) => {
            tracing::error!(project_id, error = %e, "Failed to load project");
            store.set_error(Some(e.user_message()));
            return Err(e);
        }
    };
    store.set_current_project(detail.project);
    store.set_tasks(detail.tasks);
    store.set_error(None);
    Ok(View::Tasks { project_id })
}

/// Refresh the list and open the current project, or fall back to the most
/// recent one. With no projects at all the form is next.
pub async fn load_current_project(
    api: &dyn PlannerApi,
    store: &Store,
) -> Result<View, ClientError> {
    refresh_projects(api, store).await?;
    let state = store.snapshot();
    let target = state
        .current_project_id
        .filter(|id| state.projects.iter().any(|p| p.id == *id))
        .or_else(|| state.projects.first().map(|p| p.id));
    match target {
        Some(project_id) => open_project(api, store, project_id).await,
        None => Ok(View::NewProject),
    }
}

/// End the session on the server, then forget all local state.
pub async fn sign_out(api: &dyn PlannerApi, store: &Store) -> Result<(), ClientError> {
    api.sign_out().await?;
    store.clear();
    Ok(())
}
