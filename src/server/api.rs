use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::ai::{AiService, AiServiceError, AiTask, GenerateTasksRequest};
use super::db::{DbHandle, NewProject, NewTask};
use crate::errors::PlannerError;
use crate::models::{
    Category, CategoryError, DEFAULT_PROJECT_TYPE, Priority, Project, Subtask, TaskId,
    TechBackground, User,
};
use crate::tech_stack::normalize_tech_stack;

/// Name of the cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "access_token";

/// Generated project names are cut to this many characters of the description.
const DEFAULT_NAME_CHARS: usize = 50;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub ai: Arc<dyn AiService>,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCurrentProjectRequest {
    pub project_id: i64,
}

#[derive(Deserialize)]
pub struct UpdateTaskStatusRequest {
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct GenerateTasksBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Deserialize)]
pub struct EnhanceIdeaRequest {
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct UpdateBackgroundRequest {
    pub background: TechBackground,
}

#[derive(Deserialize)]
pub struct UpdateNameRequest {
    #[serde(default)]
    pub name: String,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Unprocessable(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({"success": false, "message": message}))).into_response()
    }
}

impl From<PlannerError> for ApiError {
    fn from(err: PlannerError) -> Self {
        match err {
            PlannerError::ProjectNotFound { .. }
            | PlannerError::TaskNotFound { .. }
            | PlannerError::UserNotFound { .. } => ApiError::NotFound(err.to_string()),
            PlannerError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            PlannerError::Forbidden(msg) => ApiError::Forbidden(msg),
            PlannerError::BadRequest(msg) => ApiError::BadRequest(msg),
            PlannerError::InvalidCategory(_) => ApiError::Unprocessable(err.to_string()),
            PlannerError::AiService(_) => {
                tracing::error!(error = %err, "AI service call failed");
                ApiError::BadGateway(err.to_string())
            }
            PlannerError::Database(_) | PlannerError::LockPoisoned | PlannerError::Other(_) => {
                tracing::error!(error = %err, "Request failed");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

fn internal(e: anyhow::Error) -> ApiError {
    PlannerError::Database(e).into()
}

// ── Session extraction ────────────────────────────────────────────────

/// The user owning the request's session cookie. Rejects with 401 when the
/// cookie is absent or does not match a signed-in user.
pub struct SessionUser(pub User);

impl FromRequestParts<SharedState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| PlannerError::Unauthorized("Please sign in".to_string()))?;
        let user = state
            .db
            .call(move |db| db.find_user_by_session(&token))
            .await
            .map_err(internal)?;
        user.map(SessionUser).ok_or_else(|| {
            PlannerError::Unauthorized("Session expired, please sign in again".to_string()).into()
        })
    }
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
        .next()
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/project", get(list_projects))
        .route("/api/project/current", post(set_current_project))
        .route("/api/project/tasks/{task_id}", patch(update_task_status))
        .route("/api/project/{project_id}", get(get_project))
        .route("/api/project/{project_id}/pin", put(toggle_pin))
        .route("/api/project/{project_id}/delete", delete(delete_project))
        .route("/api/project/{project_id}/tech-stack", put(update_tech_stack))
        .route("/api/agent/generate-tasks", post(generate_tasks))
        .route("/api/agent/enhance-idea", post(enhance_idea))
        .route("/api/user/update-background", put(update_background))
        .route("/api/user/update-name", put(update_name))
        .route("/api/user/signout", post(sign_out))
        .route("/api/user/delete/{user_id}", delete(delete_user))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// First 50 characters of the description, with an ellipsis when cut.
pub fn default_project_name(description: &str) -> String {
    let description = description.trim();
    if description.chars().count() <= DEFAULT_NAME_CHARS {
        return description.to_string();
    }
    let head: String = description.chars().take(DEFAULT_NAME_CHARS).collect();
    format!("{}...", head.trim_end())
}

/// Validate generated tasks and give every subtask an id. A task without a
/// category lands in setup; a `planning` (or unknown) category is rejected.
pub fn build_new_tasks(tasks: &[AiTask]) -> Result<Vec<NewTask>, CategoryError> {
    let mut built = Vec::with_capacity(tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        let text = task.text.trim();
        if text.is_empty() {
            tracing::warn!(index = i, "Skipping generated task with empty text");
            continue;
        }
        let category = match task.category.as_deref().map(str::trim) {
            None | Some("") => Category::Setup,
            Some(raw) => raw.parse()?,
        };
        let subtasks = task
            .subtasks
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.text.trim().is_empty())
            .map(|(j, s)| Subtask {
                id: s
                    .id
                    .clone()
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| format!("task-{}-sub-{}", i + 1, j + 1)),
                text: s.text.trim().to_string(),
                completed: false,
            })
            .collect();
        built.push(NewTask {
            text: text.to_string(),
            category,
            subtasks,
        });
    }
    Ok(built)
}

/// Fetch a project visible to `user_id`. Other users' projects are reported
/// as missing.
async fn owned_project(
    state: &SharedState,
    user_id: i64,
    project_id: i64,
) -> Result<Project, ApiError> {
    let project = state
        .db
        .call(move |db| db.get_project(project_id))
        .await
        .map_err(internal)?;
    match project {
        Some(p) if p.user_id == user_id => Ok(p),
        _ => Err(PlannerError::ProjectNotFound { id: project_id }.into()),
    }
}

// ── Project handlers ──────────────────────────────────────────────────

async fn list_projects(
    State(state): State<SharedState>,
    SessionUser(user): SessionUser,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.id;
    let (projects, current) = state
        .db
        .call(move |db| {
            let projects = db.list_projects(user_id)?;
            let current = db
                .get_user_project(user_id)?
                .and_then(|up| up.current_project_id);
            Ok((projects, current))
        })
        .await
        .map_err(internal)?;
    Ok(Json(json!({
        "success": true,
        "projects": projects,
        "currentProjectId": current,
    })))
}

async fn get_project(
    State(state): State<SharedState>,
    SessionUser(user): SessionUser,
    Path(project_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let project = owned_project(&state, user.id, project_id).await?;
    let user_id = user.id;
    let tasks = state
        .db
        .call(move |db| {
            let tasks = db.list_tasks(project_id)?;
            db.set_current_project(user_id, project_id)?;
            Ok(tasks)
        })
        .await
        .map_err(internal)?;
    Ok(Json(json!({"success": true, "project": project, "tasks": tasks})))
}

async fn set_current_project(
    State(state): State<SharedState>,
    SessionUser(user): SessionUser,
    Json(req): Json<SetCurrentProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let project = owned_project(&state, user.id, req.project_id).await?;
    let user_id = user.id;
    let user_project = state
        .db
        .call(move |db| db.set_current_project(user_id, project.id))
        .await
        .map_err(internal)?;
    Ok(Json(json!({
        "success": true,
        "currentProjectId": user_project.current_project_id,
        "recentProjects": user_project.recent_projects,
    })))
}

async fn update_task_status(
    State(state): State<SharedState>,
    SessionUser(user): SessionUser,
    Path(task_id): Path<String>,
    Json(req): Json<UpdateTaskStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = TaskId::new(task_id);
    let user_id = user.id;
    let lookup = id.clone();
    let task = state
        .db
        .call(move |db| db.update_task_completed(user_id, &lookup, req.completed))
        .await
        .map_err(internal)?
        .ok_or_else(|| PlannerError::TaskNotFound {
            id: id.to_string(),
        })?;
    tracing::debug!(task_id = %task.id, completed = task.completed, "Task status updated");
    Ok(Json(json!({"success": true, "task": task})))
}

async fn toggle_pin(
    State(state): State<SharedState>,
    SessionUser(user): SessionUser,
    Path(project_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    owned_project(&state, user.id, project_id).await?;
    let project = state
        .db
        .call(move |db| db.toggle_project_pin(project_id))
        .await
        .map_err(internal)?
        .ok_or(PlannerError::ProjectNotFound { id: project_id })?;
    Ok(Json(json!({"success": true, "project": project})))
}

async fn delete_project(
    State(state): State<SharedState>,
    SessionUser(user): SessionUser,
    Path(project_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state
        .db
        .call(move |db| db.get_project(project_id))
        .await
        .map_err(internal)?
        .ok_or(PlannerError::ProjectNotFound { id: project_id })?;
    if project.user_id != user.id {
        return Err(
            PlannerError::Forbidden("Not authorized to delete this project".to_string()).into(),
        );
    }

    state
        .db
        .call(move |db| db.delete_project(project_id))
        .await
        .map_err(internal)?;
    tracing::info!(project_id, user_id = user.id, "Project deleted");
    Ok(Json(json!({"success": true, "message": "Project deleted successfully"})))
}

async fn update_tech_stack(
    State(state): State<SharedState>,
    SessionUser(user): SessionUser,
    Path(project_id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    owned_project(&state, user.id, project_id).await?;
    let stack = normalize_tech_stack(&body);
    let project = state
        .db
        .call(move |db| db.update_project_tech_stack(project_id, &stack))
        .await
        .map_err(internal)?
        .ok_or(PlannerError::ProjectNotFound { id: project_id })?;
    Ok(Json(json!({"success": true, "project": project})))
}

// ── Agent handlers ────────────────────────────────────────────────────

async fn generate_tasks(
    State(state): State<SharedState>,
    SessionUser(user): SessionUser,
    Json(req): Json<GenerateTasksBody>,
) -> Result<impl IntoResponse, ApiError> {
    let description = req.description.trim().to_string();
    if description.is_empty() {
        return Err(PlannerError::BadRequest("Description is required".to_string()).into());
    }

    let priority: Priority = req
        .priority
        .as_deref()
        .and_then(|p| p.parse().ok())
        .unwrap_or_default();
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_project_name(&description));

    let request = GenerateTasksRequest {
        description: description.clone(),
        priority: priority.as_str().to_string(),
        background: user.background.clone(),
    };
    let plan = state
        .ai
        .generate_tasks(&request)
        .await
        .map_err(PlannerError::from)?;

    let tasks = build_new_tasks(&plan.tasks).map_err(PlannerError::from)?;
    if tasks.is_empty() {
        return Err(PlannerError::AiService(AiServiceError::InvalidResponse(
            "no tasks were generated".to_string(),
        ))
        .into());
    }

    let new_project = NewProject {
        name,
        description,
        priority,
        project_type: plan
            .project_type
            .unwrap_or_else(|| DEFAULT_PROJECT_TYPE.to_string()),
        tech_stack: plan.tech_stack,
    };
    let user_id = user.id;
    let (project, tasks) = state
        .db
        .call(move |db| {
            let created = db.create_project_with_tasks(user_id, &new_project, &tasks)?;
            db.set_current_project(user_id, created.0.id)?;
            Ok(created)
        })
        .await
        .map_err(internal)?;

    tracing::info!(
        project_id = project.id,
        user_id,
        tasks = tasks.len(),
        "Generated project"
    );
    Ok(Json(json!({
        "success": true,
        "data": tasks,
        "tech_stack_recommendation": project.tech_stack,
        "projectId": project.id,
        "projectName": project.name,
        "project_type": project.project_type,
    })))
}

async fn enhance_idea(
    State(state): State<SharedState>,
    SessionUser(_user): SessionUser,
    Json(req): Json<EnhanceIdeaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();
    let description = req.description.trim();
    if description.is_empty() {
        return Err(PlannerError::BadRequest("Description is required".to_string()).into());
    }

    let enhancement = state
        .ai
        .enhance_idea(description)
        .await
        .map_err(PlannerError::from)?;
    Ok(Json(json!({
        "success": true,
        "enhancedDescription": enhancement.enhanced_description,
        "suggestedFeatures": enhancement.suggested_features,
        "processingTime": started.elapsed().as_millis() as u64,
    })))
}

// ── User handlers ─────────────────────────────────────────────────────

async fn update_background(
    State(state): State<SharedState>,
    SessionUser(user): SessionUser,
    Json(req): Json<UpdateBackgroundRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.id;
    let updated = state
        .db
        .call(move |db| db.update_user_background(user_id, &req.background))
        .await
        .map_err(internal)?;
    Ok(Json(json!({"success": true, "user": updated})))
}

async fn update_name(
    State(state): State<SharedState>,
    SessionUser(user): SessionUser,
    Json(req): Json<UpdateNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(PlannerError::BadRequest("Name is required".to_string()).into());
    }
    let user_id = user.id;
    let updated = state
        .db
        .call(move |db| db.update_user_name(user_id, &name))
        .await
        .map_err(internal)?;
    Ok(Json(json!({"success": true, "user": updated})))
}

async fn sign_out(
    State(state): State<SharedState>,
    SessionUser(user): SessionUser,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.id;
    state
        .db
        .call(move |db| db.clear_session(user_id))
        .await
        .map_err(internal)?;
    let expired = format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax");
    Ok((
        [(header::SET_COOKIE, expired)],
        Json(json!({"success": true, "message": "Signed out successfully"})),
    ))
}

async fn delete_user(
    State(state): State<SharedState>,
    SessionUser(user): SessionUser,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if user_id != user.id {
        return Err(
            PlannerError::Forbidden("Not authorized to delete this user".to_string()).into(),
        );
    }
    let deleted = state
        .db
        .call(move |db| db.delete_user(user_id))
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(PlannerError::UserNotFound { id: user_id }.into());
    }
    tracing::info!(user_id, "User deleted");
    Ok(Json(json!({"success": true, "message": "User deleted successfully"})))
}

async fn health_check() -> &'static str {
    "ok"
}

// ── Tests ─────────────────────────────────────────────────────────────
