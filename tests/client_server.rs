//! End-to-end tests: the HTTP client against a live server on a loopback port,
//! with the AI service replaced by a fake.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use learnstack::client::api::{GenerateTasksBody, HttpPlannerClient, PlannerApi};
use learnstack::client::categories::{CategoryFilter, group_by_category};
use learnstack::client::draft::{DraftStore, LocalStorage};
use learnstack::client::form::{ProjectCreation, ProjectForm};
use learnstack::client::projects::load_current_project;
use learnstack::client::store::Store;
use learnstack::client::sync::TaskSync;
use learnstack::client::view::TaskView;
use learnstack::client::{Notifier, View};
use learnstack::errors::ClientError;
use learnstack::models::{Category, Enhancement};
use learnstack::server::ai::{
    AiService, AiServiceError, AiSubtask, AiTask, GenerateTasksRequest, GeneratedPlan,
};
use learnstack::server::api::AppState;
use learnstack::server::app::{build_router, serve};
use learnstack::server::db::{DbHandle, PlannerDb};
use learnstack::tech_stack::TechStack;

struct ScriptedAi;

fn ai_task(text: &str, category: &str) -> AiTask {
    AiTask {
        id: None,
        text: text.to_string(),
        category: Some(category.to_string()),
        subtasks: vec![AiSubtask {
            id: None,
            text: format!("{text}: first step"),
        }],
    }
}

#[async_trait]
impl AiService for ScriptedAi {
    async fn generate_tasks(
        &self,
        _request: &GenerateTasksRequest,
    ) -> Result<GeneratedPlan, AiServiceError> {
        Ok(GeneratedPlan {
            tasks: vec![
                ai_task("Initialize repository", "setup"),
                ai_task("Build todo list UI", "frontend"),
                ai_task("Add REST endpoints", "backend"),
                ai_task("Write API tests", "testing"),
            ],
            tech_stack: TechStack {
                frontend: vec!["React".into()],
                backend: vec!["Express".into()],
                ..TechStack::default()
            },
            project_type: Some("web".into()),
        })
    }

    async fn enhance_idea(&self, description: &str) -> Result<Enhancement, AiServiceError> {
        Ok(Enhancement {
            enhanced_description: format!("{description} with reminders"),
            suggested_features: vec!["Reminders".into()],
        })
    }

    async fn health(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct Silent;

impl Notifier for Silent {
    fn alert(&self, _message: &str) {}
}

struct Running {
    base_url: String,
    token: String,
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

async fn start() -> Running {
    let db = PlannerDb::new_in_memory().unwrap();
    let user = db.create_user("Ada", "ada@example.com").unwrap();
    let token = db.create_session(user.id).unwrap();
    let state = Arc::new(AppState {
        db: DbHandle::new(db),
        ai: Arc::new(ScriptedAi),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    let handle = tokio::spawn(serve(listener, build_router(state, false), async move {
        signal.cancelled().await
    }));
    Running {
        base_url,
        token,
        shutdown,
        handle,
    }
}

impl Running {
    fn client(&self) -> Arc<HttpPlannerClient> {
        Arc::new(HttpPlannerClient::new(&self.base_url, Some(self.token.clone()), None).unwrap())
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_create_project_then_toggle_a_task() {
    let server = start().await;
    let api = server.client();
    let store = Store::new();
    let dir = tempfile::tempdir().unwrap();
    let drafts = DraftStore::new(LocalStorage::open(dir.path()));
    let form = ProjectForm {
        name: "Todo App".into(),
        description: "A simple todo list".into(),
        priority: "Speed (Ship fast, even if basic)".into(),
    };
    drafts.save(&form).unwrap();

    let creation = ProjectCreation::new(api.clone(), store.clone(), drafts.clone(), Arc::new(Silent));
    let view = creation.submit(&form).await.unwrap();
    let View::Tasks { project_id } = view else {
        panic!("Expected the task view, got {view:?}");
    };
    assert!(drafts.load().is_none());

    let project = store.current_project().unwrap();
    assert_eq!(project.id, project_id);
    assert_eq!(project.tech_stack.frontend, vec!["React".to_string()]);
    let tasks = store.tasks();
    assert_eq!(tasks.len(), 4);
    assert_eq!(tasks[0].subtasks.len(), 1);

    let groups = group_by_category(&tasks);
    let order: Vec<Category> = groups.iter().map(|g| g.category).collect();
    assert_eq!(
        order,
        vec![
            Category::Setup,
            Category::Frontend,
            Category::Backend,
            Category::Testing
        ]
    );

    let sync = TaskSync::new(store.clone(), api.clone(), Arc::new(Silent));
    let mut view = TaskView::new(sync);
    let target = tasks[1].id.clone();
    let stored = view
        .set_completed(target.clone(), true)
        .unwrap()
        .await
        .unwrap()
        .unwrap();
    assert!(stored);
    assert_eq!(view.progress().completed, 1);

    view.set_filter(CategoryFilter::Only(Category::Frontend));
    assert!(view.visible_tasks().iter().all(|t| t.completed));

    // A fresh client sees the persisted flag.
    let fresh = Store::new();
    let loaded = load_current_project(api.as_ref(), &fresh).await.unwrap();
    assert_eq!(loaded, View::Tasks { project_id });
    assert_eq!(fresh.task_completed(&target), Some(true));

    drop(view);
    server.stop().await;
}

#[tokio::test]
async fn test_unknown_task_is_reverted_after_server_404() {
    let server = start().await;
    let api = server.client();
    let generated = api
        .generate_tasks(&GenerateTasksBody {
            name: String::new(),
            description: "A simple todo list".into(),
            priority: "Learning".into(),
        })
        .await
        .unwrap();
    assert_eq!(generated.project_name.as_deref(), Some("A simple todo list"));

    // Pretend the client holds a task the server never had.
    let store = Store::new();
    let mut tasks = generated.tasks.clone();
    tasks[0].id = "not-on-server".into();
    store.set_tasks(tasks);

    let sync = TaskSync::new(store.clone(), api.clone(), Arc::new(Silent));
    let err = sync
        .toggle(&"not-on-server".into(), true, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Http { status: 404, .. }));
    assert_eq!(store.task_completed(&"not-on-server".into()), Some(false));

    server.stop().await;
}

#[tokio::test]
async fn test_enhance_and_missing_session() {
    let server = start().await;
    let enhancement = server
        .client()
        .enhance_idea("A simple todo list")
        .await
        .unwrap();
    assert_eq!(enhancement.enhanced_description, "A simple todo list with reminders");
    assert_eq!(enhancement.suggested_features, vec!["Reminders".to_string()]);

    let anonymous = HttpPlannerClient::new(&server.base_url, None, None).unwrap();
    let err = anonymous.list_projects().await.unwrap_err();
    assert!(matches!(err, ClientError::Http { status: 401, .. }));

    server.stop().await;
}
