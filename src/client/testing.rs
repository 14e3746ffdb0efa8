//! Fakes shared by the client tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::Notifier;
use super::api::{GenerateTasksBody, GeneratedProject, PlannerApi, ProjectDetail, ProjectList};
use crate::errors::ClientError;
use crate::models::{
    Category, Enhancement, Priority, Project, Task, TaskId, TechBackground, User,
};
use crate::tech_stack::TechStack;

pub fn sample_project(id: i64) -> Project {
    Project {
        id,
        user_id: 1,
        name: format!("Project {id}"),
        description: "A simple todo list".into(),
        priority: Priority::Speed,
        project_type: "web".into(),
        tech_stack: TechStack::default(),
        pinned: false,
        created_at: "2024-01-01 00:00:00".into(),
    }
}

pub fn task(id: &str, category: Category, completed: bool) -> Task {
    Task {
        id: TaskId::from(id),
        project_id: 1,
        user_id: 1,
        text: format!("Task {id}"),
        category,
        completed,
        subtasks: vec![],
        order: 0,
        created_at: "2024-01-01 00:00:00".into(),
    }
}

/// Three tasks: t1 (setup, done), t2 (frontend), t3 (setup).
pub fn sample_tasks() -> Vec<Task> {
    vec![
        task("t1", Category::Setup, true),
        task("t2", Category::Frontend, false),
        task("t3", Category::Setup, false),
    ]
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub alerts: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }
}

/// Scriptable [`PlannerApi`].
///
/// `started` is signalled whenever a call begins; when `hold` is set, calls
/// wait on it before answering.
#[derive(Default)]
pub struct FakeApi {
    pub fail: bool,
    /// Flag the server claims to have stored, overriding the requested one.
    pub server_flag: Option<bool>,
    pub generated: Option<GeneratedProject>,
    pub enhancement: Option<Enhancement>,
    pub detail: Option<ProjectDetail>,
    pub list: Option<ProjectList>,
    pub started: Arc<Notify>,
    pub hold: Option<Arc<Notify>>,
    pub calls: Mutex<VecDeque<String>>,
}

impl FakeApi {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().cloned().collect()
    }

    async fn enter(&self, call: String) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push_back(call);
        self.started.notify_one();
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        if self.fail {
            return Err(ClientError::Http {
                status: 500,
                message: "Internal server error".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PlannerApi for FakeApi {
    async fn list_projects(&self) -> Result<ProjectList, ClientError> {
        self.enter("list_projects".into()).await?;
        self.list
            .clone()
            .ok_or_else(|| ClientError::InvalidResponse("no list".into()))
    }

    async fn get_project(&self, project_id: i64) -> Result<ProjectDetail, ClientError> {
        self.enter(format!("get_project {project_id}")).await?;
        self.detail.clone().ok_or(ClientError::Http {
            status: 404,
            message: format!("Project {project_id} not found"),
        })
    }

    async fn set_current_project(&self, project_id: i64) -> Result<Option<i64>, ClientError> {
        self.enter(format!("set_current_project {project_id}")).await?;
        Ok(Some(project_id))
    }

    async fn update_task_status(
        &self,
        id: &TaskId,
        completed: bool,
    ) -> Result<bool, ClientError> {
        self.enter(format!("update_task_status {id} {completed}")).await?;
        Ok(self.server_flag.unwrap_or(completed))
    }

    async fn generate_tasks(
        &self,
        body: &GenerateTasksBody,
    ) -> Result<GeneratedProject, ClientError> {
        self.enter(format!("generate_tasks {}", body.name)).await?;
        self.generated
            .clone()
            .ok_or_else(|| ClientError::InvalidResponse("no project".into()))
    }

    async fn enhance_idea(&self, description: &str) -> Result<Enhancement, ClientError> {
        self.enter(format!("enhance_idea {description}")).await?;
        Ok(self.enhancement.clone().unwrap_or_else(|| Enhancement {
            enhanced_description: format!("{description}, but better"),
            suggested_features: vec![],
        }))
    }

    async fn update_background(&self, background: &TechBackground) -> Result<User, ClientError> {
        self.enter("update_background".into()).await?;
        Ok(User {
            id: 1,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            background: background.clone(),
            created_at: String::new(),
        })
    }

    async fn update_name(&self, name: &str) -> Result<User, ClientError> {
        self.enter(format!("update_name {name}")).await?;
        Ok(User {
            id: 1,
            name: name.to_string(),
            email: "ada@example.com".into(),
            background: TechBackground::default(),
            created_at: String::new(),
        })
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        self.enter("sign_out".into()).await
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), ClientError> {
        self.enter(format!("delete_user {user_id}")).await
    }
}
