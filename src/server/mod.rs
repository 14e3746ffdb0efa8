//! REST back-end: projects, tasks and users over SQLite, with task
//! generation and idea enhancement delegated to the external AI service.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  app.rs   (axum Router, ServerConfig, serve)     │
//! │          │ <─────── │    └─ api.rs  (handlers, SessionUser, ApiError)  │
//! └──────────┘  cookie  │         │                     │                  │
//!                       │         v                     v                  │
//!                       │  db.rs  (DbHandle)      ai.rs  (AiService)       │
//!                       │    SQLite                 └─ HTTP ─> AI service  │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Typical Request Flow (generate a project)
//!
//! 1. `POST /api/agent/generate-tasks` → `api::generate_tasks()`
//! 2. The session cookie resolves to a `User`, whose tech background is sent
//!    along with the description to `AiService::generate_tasks()`.
//! 3. The response is normalized (tech-stack shape, categories, subtask ids)
//!    and the project plus its tasks are inserted in one transaction.
//! 4. The new project becomes the user's current project and heads the
//!    recent-projects list.

pub mod ai;
pub mod api;
pub mod app;
pub mod db;
