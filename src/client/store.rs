//! Client state store.
//!
//! One `ClientState` behind a mutex, shared by cheap cloneable [`Store`]
//! handles. The lock is only ever held inside a single method call, never
//! across an `.await`.

use std::sync::{Arc, Mutex, PoisonError};

use crate::models::{Project, Task, TaskId, User};

/// Everything the client keeps between calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientState {
    pub current_user: Option<User>,
    /// Projects of the signed-in user, newest first.
    pub projects: Vec<Project>,
    pub current_project_id: Option<i64>,
    pub current_project: Option<Project>,
    /// `None` until a project's tasks have been loaded.
    pub current_tasks: Option<Vec<Task>>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<Mutex<ClientState>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut ClientState) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// A copy of the whole state.
    pub fn snapshot(&self) -> ClientState {
        self.with(|s| s.clone())
    }

    // ── User ──────────────────────────────────────────────────────────

    pub fn set_user(&self, user: User) {
        self.with(|s| s.current_user = Some(user));
    }

    pub fn current_user_id(&self) -> Option<i64> {
        self.with(|s| s.current_user.as_ref().map(|u| u.id))
    }

    /// Forget everything (sign-out).
    pub fn clear(&self) {
        self.with(|s| *s = ClientState::default());
    }

    // ── Projects ──────────────────────────────────────────────────────

    pub fn set_projects(&self, projects: Vec<Project>, current_project_id: Option<i64>) {
        self.with(|s| {
            s.projects = projects;
            s.current_project_id = current_project_id;
        });
    }

    /// Make `project` current, adding it to (or refreshing it in) the list.
    pub fn set_current_project(&self, project: Project) {
        self.with(|s| {
            match s.projects.iter_mut().find(|p| p.id == project.id) {
                Some(existing) => *existing = project.clone(),
                None => s.projects.insert(0, project.clone()),
            }
            s.current_project_id = Some(project.id);
            s.current_project = Some(project);
        });
    }

    pub fn current_project(&self) -> Option<Project> {
        self.with(|s| s.current_project.clone())
    }

    // ── Tasks ─────────────────────────────────────────────────────────

    pub fn set_tasks(&self, tasks: Vec<Task>) {
        self.with(|s| s.current_tasks = Some(tasks));
    }

    pub fn clear_tasks(&self) {
        self.with(|s| s.current_tasks = None);
    }

    /// The current task list, empty when none is loaded.
    pub fn tasks(&self) -> Vec<Task> {
        self.with(|s| s.current_tasks.clone().unwrap_or_default())
    }

    pub fn task_completed(&self, id: &TaskId) -> Option<bool> {
        self.with(|s| {
            s.current_tasks
                .as_ref()?
                .iter()
                .find(|t| t.id == *id)
                .map(|t| t.completed)
        })
    }

    /// Set a task's flag, returning the previous one, or `None` if the task
    /// is not in the current list (in which case nothing changes).
    pub fn set_task_completed(&self, id: &TaskId, completed: bool) -> Option<bool> {
        self.with(|s| {
            let task = s.current_tasks.as_mut()?.iter_mut().find(|t| t.id == *id)?;
            Some(std::mem::replace(&mut task.completed, completed))
        })
    }

    /// Invert a task's flag under one lock, returning the previous flag.
    pub fn flip_task_completed(&self, id: &TaskId) -> Option<bool> {
        self.with(|s| {
            let task = s.current_tasks.as_mut()?.iter_mut().find(|t| t.id == *id)?;
            let previous = task.completed;
            task.completed = !previous;
            Some(previous)
        })
    }

    pub fn remove_task(&self, id: &TaskId) -> bool {
        self.with(|s| match s.current_tasks.as_mut() {
            Some(tasks) => {
                let before = tasks.len();
                tasks.retain(|t| t.id != *id);
                tasks.len() != before
            }
            None => false,
        })
    }

    // ── Status ────────────────────────────────────────────────────────

    pub fn set_loading(&self, loading: bool) {
        self.with(|s| s.loading = loading);
    }

    pub fn set_error(&self, error: Option<String>) {
        self.with(|s| s.error = error);
    }
}
