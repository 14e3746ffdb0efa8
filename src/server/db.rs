use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::models::*;
use crate::tech_stack::TechStack;

/// Async-safe handle to the planner database.
///
/// Wraps `PlannerDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O never
/// ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<PlannerDb>>,
}

impl DbHandle {
    pub fn new(db: PlannerDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&PlannerDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }

    /// Acquire the database mutex synchronously. For startup and tests only.
    pub fn lock_sync(&self) -> Result<std::sync::MutexGuard<'_, PlannerDb>> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))
    }
}

/// Fields of a project about to be created.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub project_type: String,
    pub tech_stack: TechStack,
}

/// Fields of a generated task about to be stored. The order index is its
/// position in the slice passed to [`PlannerDb::create_project_with_tasks`].
#[derive(Debug, Clone)]
pub struct NewTask {
    pub text: String,
    pub category: Category,
    pub subtasks: Vec<Subtask>,
}

pub struct PlannerDb {
    conn: Connection,
}

const PROJECT_COLUMNS: &str =
    "id, user_id, name, description, priority, project_type, tech_stack, pinned, created_at";
const TASK_COLUMNS: &str =
    "id, project_id, user_id, text, category, completed, subtasks, position, created_at";
const USER_COLUMNS: &str = "id, name, email, background, created_at";

impl PlannerDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    email TEXT NOT NULL UNIQUE,
                    background TEXT NOT NULL DEFAULT '{}',
                    session_token TEXT UNIQUE,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL,
                    priority TEXT NOT NULL DEFAULT 'Speed',
                    project_type TEXT NOT NULL DEFAULT 'web',
                    tech_stack TEXT NOT NULL DEFAULT '{}',
                    pinned INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id TEXT PRIMARY KEY,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    text TEXT NOT NULL,
                    category TEXT NOT NULL,
                    completed INTEGER NOT NULL DEFAULT 0,
                    subtasks TEXT NOT NULL DEFAULT '[]',
                    position INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS user_projects (
                    user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                    current_project_id INTEGER REFERENCES projects(id) ON DELETE SET NULL,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS recent_projects (
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    last_accessed TEXT NOT NULL,
                    PRIMARY KEY (user_id, project_id)
                );

                CREATE INDEX IF NOT EXISTS idx_projects_user ON projects(user_id);
                CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id, position);
                CREATE INDEX IF NOT EXISTS idx_recent_projects_user ON recent_projects(user_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Users ─────────────────────────────────────────────────────────

    pub fn create_user(&self, name: &str, email: &str) -> Result<User> {
        self.conn
            .execute(
                "INSERT INTO users (name, email) VALUES (?1, ?2)",
                params![name, email],
            )
            .context("Failed to insert user")?;
        let id = self.conn.last_insert_rowid();
        self.get_user(id)?.context("User not found after insert")
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.query_user(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"), params![id])
    }

    pub fn find_user_by_session(&self, token: &str) -> Result<Option<User>> {
        self.query_user(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE session_token = ?1"),
            params![token],
        )
    }

    fn query_user(&self, sql: &str, args: impl rusqlite::Params) -> Result<Option<User>> {
        let mut stmt = self.conn.prepare(sql).context("Failed to prepare user query")?;
        let mut rows = stmt
            .query_map(args, |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    background: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .context("Failed to query user")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("Failed to read user row")?.into_user()?)),
            None => Ok(None),
        }
    }

    /// Issue a fresh session token for a user, replacing any previous one.
    pub fn create_session(&self, user_id: i64) -> Result<String> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let updated = self
            .conn
            .execute(
                "UPDATE users SET session_token = ?1 WHERE id = ?2",
                params![token, user_id],
            )
            .context("Failed to store session token")?;
        anyhow::ensure!(updated == 1, "User {} not found", user_id);
        Ok(token)
    }

    pub fn clear_session(&self, user_id: i64) -> Result<()> {
        self.conn
            .execute(
                "UPDATE users SET session_token = NULL WHERE id = ?1",
                params![user_id],
            )
            .context("Failed to clear session token")?;
        Ok(())
    }

    pub fn update_user_background(&self, id: i64, background: &TechBackground) -> Result<User> {
        let json = serde_json::to_string(background).context("Failed to encode background")?;
        self.conn
            .execute(
                "UPDATE users SET background = ?1 WHERE id = ?2",
                params![json, id],
            )
            .context("Failed to update user background")?;
        self.get_user(id)?.context("User not found after background update")
    }

    pub fn update_user_name(&self, id: i64, name: &str) -> Result<User> {
        self.conn
            .execute("UPDATE users SET name = ?1 WHERE id = ?2", params![name, id])
            .context("Failed to update user name")?;
        self.get_user(id)?.context("User not found after name update")
    }

    /// Delete a user and, through cascades, everything they own.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .context("Failed to delete user")?;
        Ok(count > 0)
    }

    // ── Projects ──────────────────────────────────────────────────────

    /// Insert a project and all of its tasks atomically.
    pub fn create_project_with_tasks(
        &self,
        user_id: i64,
        project: &NewProject,
        tasks: &[NewTask],
    ) -> Result<(Project, Vec<Task>)> {
        let tech_stack =
            serde_json::to_string(&project.tech_stack).context("Failed to encode tech stack")?;

        // Safety: DbHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        tx.execute(
            "INSERT INTO projects (user_id, name, description, priority, project_type, tech_stack)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                project.name,
                project.description,
                project.priority.as_str(),
                project.project_type,
                tech_stack
            ],
        )
        .context("Failed to insert project")?;
        let project_id = tx.last_insert_rowid();

        for (position, task) in tasks.iter().enumerate() {
            let subtasks =
                serde_json::to_string(&task.subtasks).context("Failed to encode subtasks")?;
            tx.execute(
                "INSERT INTO tasks (id, project_id, user_id, text, category, subtasks, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    TaskId::generate().as_str(),
                    project_id,
                    user_id,
                    task.text,
                    task.category.as_str(),
                    subtasks,
                    position as i64
                ],
            )
            .with_context(|| format!("Failed to insert task {}", position))?;
        }

        tx.commit().context("Failed to commit project")?;

        let created = self
            .get_project(project_id)?
            .context("Project not found after insert")?;
        let tasks = self.list_tasks(project_id)?;
        Ok((created, tasks))
    }

    /// Projects owned by `user_id`, newest first.
    pub fn list_projects(&self, user_id: i64) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
            ))
            .context("Failed to prepare list_projects")?;
        let rows = stmt
            .query_map(params![user_id], ProjectRow::from_row)
            .context("Failed to query projects")?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row.context("Failed to read project row")?.into_project()?);
        }
        Ok(projects)
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"))
            .context("Failed to prepare get_project")?;
        let mut rows = stmt
            .query_map(params![id], ProjectRow::from_row)
            .context("Failed to query project")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("Failed to read project row")?.into_project()?)),
            None => Ok(None),
        }
    }

    /// Flip the pinned flag. Returns `None` if the project does not exist.
    pub fn toggle_project_pin(&self, id: i64) -> Result<Option<Project>> {
        let count = self
            .conn
            .execute(
                "UPDATE projects SET pinned = 1 - pinned WHERE id = ?1",
                params![id],
            )
            .context("Failed to toggle project pin")?;
        if count == 0 {
            return Ok(None);
        }
        self.get_project(id)
    }

    pub fn update_project_tech_stack(&self, id: i64, stack: &TechStack) -> Result<Option<Project>> {
        let json = serde_json::to_string(stack).context("Failed to encode tech stack")?;
        let count = self
            .conn
            .execute(
                "UPDATE projects SET tech_stack = ?1 WHERE id = ?2",
                params![json, id],
            )
            .context("Failed to update tech stack")?;
        if count == 0 {
            return Ok(None);
        }
        self.get_project(id)
    }

    /// Delete a project. Its tasks and recent-list entries cascade; a user
    /// pointing at it as current is left with no current project.
    pub fn delete_project(&self, id: i64) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", params![id])
            .context("Failed to delete project")?;
        Ok(count > 0)
    }

    // ── Tasks ─────────────────────────────────────────────────────────

    /// Tasks of a project, in generation order.
    pub fn list_tasks(&self, project_id: i64) -> Result<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 ORDER BY position"
            ))
            .context("Failed to prepare list_tasks")?;
        let rows = stmt
            .query_map(params![project_id], TaskRow::from_row)
            .context("Failed to query tasks")?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row.context("Failed to read task row")?.into_task()?);
        }
        Ok(tasks)
    }

    pub fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))
            .context("Failed to prepare get_task")?;
        let mut rows = stmt
            .query_map(params![id.as_str()], TaskRow::from_row)
            .context("Failed to query task")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("Failed to read task row")?.into_task()?)),
            None => Ok(None),
        }
    }

    /// Set a task's completion flag, scoped to its owner. Returns `None` when
    /// no such task belongs to `user_id`.
    pub fn update_task_completed(
        &self,
        user_id: i64,
        id: &TaskId,
        completed: bool,
    ) -> Result<Option<Task>> {
        let count = self
            .conn
            .execute(
                "UPDATE tasks SET completed = ?1, updated_at = datetime('now')
                 WHERE id = ?2 AND user_id = ?3",
                params![completed, id.as_str(), user_id],
            )
            .context("Failed to update task status")?;
        if count == 0 {
            return Ok(None);
        }
        self.get_task(id)
    }

    // ── Current / recent projects ─────────────────────────────────────

    /// Make `project_id` the user's current project and move it to the head
    /// of the recent list, evicting the oldest entries past the limit.
    pub fn set_current_project(&self, user_id: i64, project_id: i64) -> Result<UserProject> {
        let now = chrono::Utc::now().to_rfc3339();

        // Safety: DbHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        tx.execute(
            "INSERT INTO user_projects (user_id, current_project_id) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET
                current_project_id = excluded.current_project_id,
                updated_at = datetime('now')",
            params![user_id, project_id],
        )
        .context("Failed to set current project")?;

        // Re-inserting gives the entry a fresh rowid, which orders recency.
        tx.execute(
            "DELETE FROM recent_projects WHERE user_id = ?1 AND project_id = ?2",
            params![user_id, project_id],
        )
        .context("Failed to remove stale recent entry")?;
        tx.execute(
            "INSERT INTO recent_projects (user_id, project_id, last_accessed) VALUES (?1, ?2, ?3)",
            params![user_id, project_id, now],
        )
        .context("Failed to record recent project")?;
        tx.execute(
            "DELETE FROM recent_projects WHERE user_id = ?1 AND project_id NOT IN (
                SELECT project_id FROM recent_projects WHERE user_id = ?1
                ORDER BY rowid DESC LIMIT ?2
             )",
            params![user_id, RECENT_PROJECTS_LIMIT as i64],
        )
        .context("Failed to trim recent projects")?;

        tx.commit().context("Failed to commit current project")?;

        self.get_user_project(user_id)?
            .context("User project not found after update")
    }

    pub fn get_user_project(&self, user_id: i64) -> Result<Option<UserProject>> {
        let mut stmt = self
            .conn
            .prepare("SELECT current_project_id FROM user_projects WHERE user_id = ?1")
            .context("Failed to prepare get_user_project")?;
        let mut rows = stmt
            .query_map(params![user_id], |row| row.get::<_, Option<i64>>(0))
            .context("Failed to query user project")?;
        let current_project_id = match rows.next() {
            Some(row) => row.context("Failed to read user project row")?,
            None => return Ok(None),
        };

        Ok(Some(UserProject {
            user_id,
            current_project_id,
            recent_projects: self.list_recent_projects(user_id)?,
        }))
    }

    /// Most recent first.
    pub fn list_recent_projects(&self, user_id: i64) -> Result<Vec<RecentProject>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT project_id, last_accessed FROM recent_projects
                 WHERE user_id = ?1 ORDER BY rowid DESC",
            )
            .context("Failed to prepare list_recent_projects")?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(RecentProject {
                    project_id: row.get(0)?,
                    last_accessed: row.get(1)?,
                })
            })
            .context("Failed to query recent projects")?;
        let mut recent = Vec::new();
        for row in rows {
            recent.push(row.context("Failed to read recent project row")?);
        }
        Ok(recent)
    }
}

// ── Internal row helpers ──────────────────────────────────────────────

/// Intermediate row struct for reading users before decoding the background JSON.
struct UserRow {
    id: i64,
    name: String,
    email: String,
    background: String,
    created_at: String,
}

impl UserRow {
    fn into_user(self) -> Result<User> {
        let background: TechBackground = serde_json::from_str(&self.background)
            .context("Failed to parse user background JSON")?;
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            background,
            created_at: self.created_at,
        })
    }
}

struct ProjectRow {
    id: i64,
    user_id: i64,
    name: String,
    description: String,
    priority: String,
    project_type: String,
    tech_stack: String,
    pinned: bool,
    created_at: String,
}

impl ProjectRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            priority: row.get(4)?,
            project_type: row.get(5)?,
            tech_stack: row.get(6)?,
            pinned: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn into_project(self) -> Result<Project> {
        let priority = Priority::from_str(&self.priority)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse project priority")?;
        let tech_stack: TechStack =
            serde_json::from_str(&self.tech_stack).context("Failed to parse tech stack JSON")?;
        Ok(Project {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            priority,
            project_type: self.project_type,
            tech_stack,
            pinned: self.pinned,
            created_at: self.created_at,
        })
    }
}

struct TaskRow {
    id: String,
    project_id: i64,
    user_id: i64,
    text: String,
    category: String,
    completed: bool,
    subtasks: String,
    position: i32,
    created_at: String,
}

impl TaskRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            user_id: row.get(2)?,
            text: row.get(3)?,
            category: row.get(4)?,
            completed: row.get(5)?,
            subtasks: row.get(6)?,
            position: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn into_task(self) -> Result<Task> {
        let category = Category::from_str(&self.category)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse task category")?;
        let subtasks: Vec<Subtask> =
            serde_json::from_str(&self.subtasks).context("Failed to parse subtasks JSON")?;
        Ok(Task {
            id: TaskId::new(self.id),
            project_id: self.project_id,
            user_id: self.user_id,
            text: self.text,
            category,
            completed: self.completed,
            subtasks,
            order: self.position,
            created_at: self.created_at,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_user(db: &PlannerDb) -> Result<User> {
        db.create_user("Ada", "ada@example.com")
    }

    fn new_project(name: &str) -> NewProject {
        NewProject {
            name: name.to_string(),
            description: format!("{name} description"),
            priority: Priority::Speed,
            project_type: DEFAULT_PROJECT_TYPE.to_string(),
            tech_stack: TechStack {
                frontend: vec!["React".into()],
                ..Default::default()
            },
        }
    }

    fn new_tasks() -> Vec<NewTask> {
        vec![
            NewTask {
                text: "Initialize repository".into(),
                category: Category::Setup,
                subtasks: vec![Subtask {
                    id: "task-1-sub-1".into(),
                    text: "git init".into(),
                    completed: false,
                }],
            },
            NewTask {
                text: "Build list component".into(),
                category: Category::Frontend,
                subtasks: vec![],
            },
            NewTask {
                text: "Write API tests".into(),
                category: Category::Testing,
                subtasks: vec![],
            },
        ]
    }

    #[test]
    fn test_create_database_and_run_migrations() -> Result<()> {
        let db = PlannerDb::new_in_memory()?;
        let table_count: i32 = db.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table'
             AND name IN ('users', 'projects', 'tasks', 'user_projects', 'recent_projects')",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(table_count, 5, "Expected 5 tables to exist");
        Ok(())
    }

    #[test]
    fn test_open_file_database_creates_parent_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("learnstack.db");
        PlannerDb::new(&path)?;
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn test_user_sessions() -> Result<()> {
        let db = PlannerDb::new_in_memory()?;
        let user = seed_user(&db)?;
        assert!(db.find_user_by_session("nope")?.is_none());

        let token = db.create_session(user.id)?;
        let found = db.find_user_by_session(&token)?.expect("session user");
        assert_eq!(found.id, user.id);

        db.clear_session(user.id)?;
        assert!(db.find_user_by_session(&token)?.is_none());
        Ok(())
    }

    #[test]
    fn test_create_session_for_unknown_user_fails() -> Result<()> {
        let db = PlannerDb::new_in_memory()?;
        assert!(db.create_session(99).is_err());
        Ok(())
    }

    #[test]
    fn test_update_user_background_and_name() -> Result<()> {
        let db = PlannerDb::new_in_memory()?;
        let user = seed_user(&db)?;
        assert_eq!(user.background, TechBackground::default());

        let background = TechBackground {
            known_tech: vec!["Rust".into()],
            disliked_tech: vec!["PHP".into()],
            starred_tech: vec!["Svelte".into()],
        };
        let updated = db.update_user_background(user.id, &background)?;
        assert_eq!(updated.background, background);

        let renamed = db.update_user_name(user.id, "Ada L.")?;
        assert_eq!(renamed.name, "Ada L.");
        assert_eq!(renamed.background, background);
        Ok(())
    }

    #[test]
    fn test_create_project_with_tasks() -> Result<()> {
        let db = PlannerDb::new_in_memory()?;
        let user = seed_user(&db)?;

        let (project, tasks) =
            db.create_project_with_tasks(user.id, &new_project("Todo App"), &new_tasks())?;
        assert_eq!(project.name, "Todo App");
        assert_eq!(project.user_id, user.id);
        assert_eq!(project.tech_stack.frontend, vec!["React".to_string()]);
        assert!(!project.pinned);

        assert_eq!(tasks.len(), 3);
        let orders: Vec<i32> = tasks.iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(tasks[0].category, Category::Setup);
        assert_eq!(tasks[0].subtasks.len(), 1);
        assert!(tasks.iter().all(|t| !t.completed && t.project_id == project.id));
        assert_ne!(tasks[0].id, tasks[1].id);
        Ok(())
    }

    #[test]
    fn test_create_project_is_all_or_nothing() -> Result<()> {
        let db = PlannerDb::new_in_memory()?;
        // Unknown owner violates the foreign key on the very first insert.
        let result = db.create_project_with_tasks(999, &new_project("Ghost"), &new_tasks());
        assert!(result.is_err());

        let count: i64 =
            db.conn
                .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        assert_eq!(count, 0);
        let count: i64 =
            db.conn
                .query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;
        assert_eq!(count, 0);
        Ok(())
    }

    #[test]
    fn test_list_projects_scoped_and_newest_first() -> Result<()> {
        let db = PlannerDb::new_in_memory()?;
        let ada = seed_user(&db)?;
        let bob = db.create_user("Bob", "bob@example.com")?;

        db.create_project_with_tasks(ada.id, &new_project("first"), &[])?;
        db.create_project_with_tasks(ada.id, &new_project("second"), &[])?;
        db.create_project_with_tasks(bob.id, &new_project("bobs"), &[])?;

        let names: Vec<String> = db
            .list_projects(ada.id)?
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["second".to_string(), "first".to_string()]);
        assert_eq!(db.list_projects(bob.id)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_update_task_completed_scoped_to_owner() -> Result<()> {
        let db = PlannerDb::new_in_memory()?;
        let ada = seed_user(&db)?;
        let bob = db.create_user("Bob", "bob@example.com")?;
        let (_, tasks) = db.create_project_with_tasks(ada.id, &new_project("p"), &new_tasks())?;
        let id = tasks[1].id.clone();

        assert!(db.update_task_completed(bob.id, &id, true)?.is_none());
        assert!(!db.get_task(&id)?.expect("task").completed);

        let updated = db.update_task_completed(ada.id, &id, true)?.expect("task");
        assert!(updated.completed);
        let reverted = db.update_task_completed(ada.id, &id, false)?.expect("task");
        assert!(!reverted.completed);

        assert!(
            db.update_task_completed(ada.id, &TaskId::from("missing"), true)?
                .is_none()
        );
        Ok(())
    }

    #[test]
    fn test_toggle_pin_and_update_tech_stack() -> Result<()> {
        let db = PlannerDb::new_in_memory()?;
        let user = seed_user(&db)?;
        let (project, _) = db.create_project_with_tasks(user.id, &new_project("p"), &[])?;

        assert!(db.toggle_project_pin(project.id)?.expect("project").pinned);
        assert!(!db.toggle_project_pin(project.id)?.expect("project").pinned);
        assert!(db.toggle_project_pin(404)?.is_none());

        let stack = TechStack {
            deploy: vec!["Fly.io".into()],
            ..Default::default()
        };
        let updated = db
            .update_project_tech_stack(project.id, &stack)?
            .expect("project");
        assert_eq!(updated.tech_stack, stack);
        Ok(())
    }

    #[test]
    fn test_recent_projects_move_to_front_and_truncate() -> Result<()> {
        let db = PlannerDb::new_in_memory()?;
        let user = seed_user(&db)?;

        let mut ids = Vec::new();
        for i in 0..7 {
            let (p, _) =
                db.create_project_with_tasks(user.id, &new_project(&format!("p{i}")), &[])?;
            ids.push(p.id);
            db.set_current_project(user.id, p.id)?;
        }

        let up = db.get_user_project(user.id)?.expect("user project");
        assert_eq!(up.current_project_id, Some(ids[6]));
        let recent: Vec<i64> = up.recent_projects.iter().map(|r| r.project_id).collect();
        assert_eq!(recent, vec![ids[6], ids[5], ids[4], ids[3], ids[2]]);

        // Revisiting an older project moves it to the head without duplicating it.
        let up = db.set_current_project(user.id, ids[3])?;
        let recent: Vec<i64> = up.recent_projects.iter().map(|r| r.project_id).collect();
        assert_eq!(recent, vec![ids[3], ids[6], ids[5], ids[4], ids[2]]);
        assert_eq!(up.current_project_id, Some(ids[3]));
        Ok(())
    }

    #[test]
    fn test_delete_project_cascades() -> Result<()> {
        let db = PlannerDb::new_in_memory()?;
        let user = seed_user(&db)?;
        let (project, tasks) =
            db.create_project_with_tasks(user.id, &new_project("p"), &new_tasks())?;
        db.set_current_project(user.id, project.id)?;

        assert!(db.delete_project(project.id)?);
        assert!(db.get_project(project.id)?.is_none());
        assert!(db.get_task(&tasks[0].id)?.is_none());

        let up = db.get_user_project(user.id)?.expect("user project");
        assert_eq!(up.current_project_id, None);
        assert!(up.recent_projects.is_empty());

        assert!(!db.delete_project(project.id)?);
        Ok(())
    }

    #[test]
    fn test_delete_user_cascades() -> Result<()> {
        let db = PlannerDb::new_in_memory()?;
        let user = seed_user(&db)?;
        let (project, _) = db.create_project_with_tasks(user.id, &new_project("p"), &new_tasks())?;

        assert!(db.delete_user(user.id)?);
        assert!(db.get_user(user.id)?.is_none());
        assert!(db.get_project(project.id)?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_db_handle_call() -> Result<()> {
        let handle = DbHandle::new(PlannerDb::new_in_memory()?);
        let user = handle
            .call(|db| db.create_user("Ada", "ada@example.com"))
            .await?;
        let fetched = handle.call(move |db| db.get_user(user.id)).await?;
        assert_eq!(fetched.map(|u| u.email), Some("ada@example.com".to_string()));
        Ok(())
    }
}
