//! Client-side state orchestration.
//!
//! ## Module Map
//!
//! | Module       | Responsibility                                              |
//! |--------------|-------------------------------------------------------------|
//! | `api`        | `PlannerApi` trait, `HttpPlannerClient`, wire ingestion     |
//! | `store`      | `Store`: shared client state behind a mutex                 |
//! | `projects`   | Loading the project list and a project's tasks into `Store` |
//! | `sync`       | Optimistic task status updates with revert on failure       |
//! | `categories` | Filtering, grouping and progress counts for the task view   |
//! | `view`       | `TaskView`: a task list tied to a `CancellationToken`       |
//! | `form`       | Project-creation form validation and submission             |
//! | `draft`      | `DraftStore` persisting the unsent form                     |
//! | `enhance`    | Idea-enhancement round trip with an in-flight guard         |
//!
//! User-visible failures go through a [`Notifier`]; everything else is
//! logged with `tracing`.

pub mod api;
pub mod categories;
pub mod draft;
pub mod enhance;
pub mod form;
pub mod projects;
pub mod store;
pub mod sync;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

/// Raises user-facing alerts.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}

/// Writes alerts to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn alert(&self, message: &str) {
        eprintln!("! {message}");
    }
}

/// Where the client should go after an action completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// The task view of a project.
    Tasks { project_id: i64 },
    /// The project-creation form.
    NewProject,
}
