//! Client side of the REST API.
//!
//! Every response is validated here, at the boundary: raw task records are
//! collapsed onto one [`TaskId`], categories are checked, and tech stacks are
//! normalized. Nothing past this module sees wire-shaped data.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ClientError;
use crate::models::{Category, Enhancement, Project, Subtask, Task, TaskId, TechBackground, User};
use crate::tech_stack::{TechStack, normalize_tech_stack};

const SESSION_COOKIE: &str = "access_token";

/// Body of `POST /api/agent/generate-tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateTasksBody {
    pub name: String,
    pub description: String,
    pub priority: String,
}

/// The generation result, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedProject {
    pub project_id: i64,
    pub project_name: Option<String>,
    pub project_type: Option<String>,
    pub tech_stack: TechStack,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectList {
    pub projects: Vec<Project>,
    pub current_project_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDetail {
    pub project: Project,
    pub tasks: Vec<Task>,
}

// ── Wire ingestion ────────────────────────────────────────────────────

/// Stringify an id field that may arrive as a string or a number.
fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct WireSubtask {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    completed: bool,
}

/// A task record as some server version may have sent it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTask {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, rename = "_id")]
    mongo_id: Option<Value>,
    #[serde(default)]
    task_id: Option<Value>,
    #[serde(default)]
    project_id: Option<i64>,
    #[serde(default)]
    user_id: Option<i64>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    subtasks: Vec<WireSubtask>,
    #[serde(default)]
    order: Option<i32>,
    #[serde(default)]
    created_at: Option<String>,
}

impl WireTask {
    /// Resolve into a [`Task`]. `index` supplies the order when the record
    /// has none; `project_id` is used when the record does not name one.
    pub fn into_task(self, index: usize, project_id: i64) -> Result<Task, ClientError> {
        let id = TaskId::resolve([
            id_string(self.id.as_ref()),
            id_string(self.mongo_id.as_ref()),
            id_string(self.task_id.as_ref()),
        ])?;
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => Category::Setup,
            Some(raw) => raw.parse::<Category>()?,
        };
        let subtasks = self
            .subtasks
            .into_iter()
            .enumerate()
            .map(|(j, s)| Subtask {
                id: id_string(s.id.as_ref())
                    .unwrap_or_else(|| format!("subtask-{}-{}", id, j + 1)),
                text: s.text,
                completed: s.completed,
            })
            .collect();

        Ok(Task {
            project_id: self.project_id.unwrap_or(project_id),
            user_id: self.user_id.unwrap_or_default(),
            text: self.text,
            category,
            completed: self.completed,
            subtasks,
            order: self.order.unwrap_or(index as i32),
            created_at: self.created_at.unwrap_or_default(),
            id,
        })
    }
}

/// Parse a JSON array of raw task records.
pub fn ingest_tasks(value: &Value, project_id: i64) -> Result<Vec<Task>, ClientError> {
    let records: Vec<WireTask> = match value {
        Value::Array(_) => serde_json::from_value(value.clone())
            .map_err(|e| ClientError::InvalidResponse(format!("task list: {e}")))?,
        Value::Null => Vec::new(),
        _ => {
            return Err(ClientError::InvalidResponse(
                "task list is not an array".to_string(),
            ));
        }
    };
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| record.into_task(i, project_id))
        .collect()
}

impl GeneratedProject {
    pub fn from_value(value: &Value) -> Result<Self, ClientError> {
        let project_id = value
            .get("projectId")
            .and_then(Value::as_i64)
            .ok_or_else(|| ClientError::InvalidResponse("missing projectId".to_string()))?;
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            project_id,
            project_name: text("projectName"),
            project_type: text("project_type"),
            tech_stack: normalize_tech_stack(value),
            tasks: ingest_tasks(value.get("data").unwrap_or(&Value::Null), project_id)?,
        })
    }
}

fn parse_field<T: serde::de::DeserializeOwned>(value: &Value, key: &str) -> Result<T, ClientError> {
    let field = value.get(key).cloned().unwrap_or(Value::Null);
    serde_json::from_value(field).map_err(|e| ClientError::InvalidResponse(format!("{key}: {e}")))
}

// ── API trait ─────────────────────────────────────────────────────────

/// The planner REST API as the client uses it.
#[async_trait]
pub trait PlannerApi: Send + Sync {
    async fn list_projects(&self) -> Result<ProjectList, ClientError>;

    async fn get_project(&self, project_id: i64) -> Result<ProjectDetail, ClientError>;

    async fn set_current_project(&self, project_id: i64) -> Result<Option<i64>, ClientError>;

    /// Persist a task's flag; returns the flag the server stored. Only a
    /// failed request or a non-success response is an error.
    async fn update_task_status(&self, id: &TaskId, completed: bool)
    -> Result<bool, ClientError>;

    async fn generate_tasks(&self, body: &GenerateTasksBody)
    -> Result<GeneratedProject, ClientError>;

    async fn enhance_idea(&self, description: &str) -> Result<Enhancement, ClientError>;

    async fn update_background(&self, background: &TechBackground) -> Result<User, ClientError>;

    async fn update_name(&self, name: &str) -> Result<User, ClientError>;

    async fn sign_out(&self) -> Result<(), ClientError>;

    async fn delete_user(&self, user_id: i64) -> Result<(), ClientError>;
}

/// `reqwest` implementation of [`PlannerApi`], authenticating with the
/// session cookie.
#[derive(Debug, Clone)]
pub struct HttpPlannerClient {
    http: Client,
    base_url: String,
    session_token: Option<String>,
}

impl HttpPlannerClient {
    pub fn new(
        base_url: &str,
        session_token: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let mut builder =
            Client::builder().user_agent(concat!("learnstack/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token: session_token.filter(|t| !t.is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.session_token {
            Some(token) => builder.header(header::COOKIE, format!("{SESSION_COOKIE}={token}")),
            None => builder,
        }
    }

    /// Send and decode, mapping non-2xx statuses and `success: false` bodies
    /// to errors carrying the server's message.
    async fn send(&self, builder: RequestBuilder) -> Result<Value, ClientError> {
        let res = builder
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }
        if body.get("success") == Some(&Value::Bool(false)) {
            return Err(ClientError::Rejected(message));
        }
        if body.is_null() {
            return Err(ClientError::InvalidResponse(format!(
                "expected JSON body, got {:?}",
                text.chars().take(80).collect::<String>()
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl PlannerApi for HttpPlannerClient {
    async fn list_projects(&self) -> Result<ProjectList, ClientError> {
        let body = self.send(self.request(Method::GET, "/api/project")).await?;
        Ok(ProjectList {
            projects: parse_field(&body, "projects")?,
            current_project_id: body.get("currentProjectId").and_then(Value::as_i64),
        })
    }

    async fn get_project(&self, project_id: i64) -> Result<ProjectDetail, ClientError> {
        let path = format!("/api/project/{project_id}");
        let body = self.send(self.request(Method::GET, &path)).await?;
        let project: Project = parse_field(&body, "project")?;
        let tasks = ingest_tasks(body.get("tasks").unwrap_or(&Value::Null), project.id)?;
        Ok(ProjectDetail { project, tasks })
    }

    async fn set_current_project(&self, project_id: i64) -> Result<Option<i64>, ClientError> {
        let builder = self
            .request(Method::POST, "/api/project/current")
            .json(&serde_json::json!({ "projectId": project_id }));
        let body = self.send(builder).await?;
        Ok(body.get("currentProjectId").and_then(Value::as_i64))
    }

    async fn update_task_status(
        &self,
        id: &TaskId,
        completed: bool,
    ) -> Result<bool, ClientError> {
        let path = format!("/api/project/tasks/{id}");
        let builder = self
            .request(Method::PATCH, &path)
            .json(&serde_json::json!({ "completed": completed }));
        // `send` only reports InvalidResponse for a 2xx body, so the update
        // has been applied by then.
        let stored = match self.send(builder).await {
            Ok(body) => body
                .get("task")
                .and_then(|task| task.get("completed"))
                .and_then(Value::as_bool),
            Err(ClientError::InvalidResponse(reason)) => {
                tracing::warn!(task_id = %id, %reason, "Unreadable task update response");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(stored.unwrap_or_else(|| {
            tracing::warn!(task_id = %id, "Task update response has no flag, keeping requested");
            completed
        }))
    }

    async fn generate_tasks(
        &self,
        request: &GenerateTasksBody,
    ) -> Result<GeneratedProject, ClientError> {
        let builder = self
            .request(Method::POST, "/api/agent/generate-tasks")
            .json(request);
        let body = self.send(builder).await?;
        GeneratedProject::from_value(&body)
    }

    async fn enhance_idea(&self, description: &str) -> Result<Enhancement, ClientError> {
        let builder = self
            .request(Method::POST, "/api/agent/enhance-idea")
            .json(&serde_json::json!({ "description": description }));
        let body = self.send(builder).await?;
        serde_json::from_value(body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    async fn update_background(&self, background: &TechBackground) -> Result<User, ClientError> {
        let builder = self
            .request(Method::PUT, "/api/user/update-background")
            .json(&serde_json::json!({ "background": background }));
        let body = self.send(builder).await?;
        parse_field(&body, "user")
    }

    async fn update_name(&self, name: &str) -> Result<User, ClientError> {
        let builder = self
            .request(Method::PUT, "/api/user/update-name")
            .json(&serde_json::json!({ "name": name }));
        let body = self.send(builder).await?;
        parse_field(&body, "user")
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        self.send(self.request(Method::POST, "/api/user/signout"))
            .await?;
        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), ClientError> {
        let path = format!("/api/user/delete/{user_id}");
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }
}
