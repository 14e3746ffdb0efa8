use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tech_stack::TechStack;

/// Maximum number of entries kept in a user's recent-projects list.
pub const RECENT_PROJECTS_LIMIT: usize = 5;

/// Project type recorded when the generation service does not report one.
pub const DEFAULT_PROJECT_TYPE: &str = "web";

// ── Identifiers ───────────────────────────────────────────────────────

/// Canonical task identifier.
///
/// Task records historically carried up to three identifier fields (`id`,
/// `_id`, `taskId`). They are collapsed into this one type when a record is
/// ingested; nothing past that boundary ever looks at the raw fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh server-assigned identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Collapse the candidate identifier fields of a raw record into one id.
    ///
    /// Blank candidates are ignored. Identical candidates agree; two different
    /// non-blank values are rejected rather than guessed between.
    pub fn resolve<I>(candidates: I) -> Result<Self, TaskIdError>
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let mut found: Option<String> = None;
        for candidate in candidates.into_iter().flatten() {
            let candidate = candidate.trim().to_string();
            if candidate.is_empty() {
                continue;
            }
            match &found {
                None => found = Some(candidate),
                Some(existing) if *existing == candidate => {}
                Some(existing) => {
                    return Err(TaskIdError::Ambiguous {
                        first: existing.clone(),
                        second: candidate,
                    });
                }
            }
        }
        found.map(Self).ok_or(TaskIdError::Missing)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskIdError {
    #[error("Task record has no identifier")]
    Missing,

    #[error("Task record has conflicting identifiers '{first}' and '{second}'")]
    Ambiguous { first: String, second: String },
}

// ── Enums ─────────────────────────────────────────────────────────────

/// Phase a task belongs to. Fixed at task creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Setup,
    Frontend,
    Backend,
    Testing,
    Deploy,
    Maintain,
}

impl Category {
    /// Display order of the task view.
    pub const ALL: [Category; 6] = [
        Self::Setup,
        Self::Frontend,
        Self::Backend,
        Self::Testing,
        Self::Deploy,
        Self::Maintain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Frontend => "frontend",
            Self::Backend => "backend",
            Self::Testing => "testing",
            Self::Deploy => "deploy",
            Self::Maintain => "maintain",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Setup => "Setup",
            Self::Frontend => "Frontend",
            Self::Backend => "Backend",
            Self::Testing => "Testing",
            Self::Deploy => "Deploy",
            Self::Maintain => "Maintain",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "setup" => Ok(Self::Setup),
            "frontend" => Ok(Self::Frontend),
            "backend" => Ok(Self::Backend),
            "testing" => Ok(Self::Testing),
            "deploy" => Ok(Self::Deploy),
            "maintain" => Ok(Self::Maintain),
            "planning" => Err(CategoryError::Unsupported(s.trim().to_string())),
            _ => Err(CategoryError::Unknown(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    /// Stored by older records but never shown in the task view.
    #[error("Unsupported category '{0}'")]
    Unsupported(String),

    #[error("Invalid category: {0}")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    #[default]
    Speed,
    Scalability,
    Learning,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Self::Speed, Self::Scalability, Self::Learning];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Speed => "Speed",
            Self::Scalability => "Scalability",
            Self::Learning => "Learning",
        }
    }

    /// Long-form label offered by the project form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Speed => "Speed (Ship fast, even if basic)",
            Self::Scalability => "Scalability (Built to grow with users)",
            Self::Learning => "Learning (Understand every piece)",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the bare name or any label that starts with it.
impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| lowered.starts_with(&p.as_str().to_ascii_lowercase()))
            .ok_or_else(|| format!("Invalid priority: {}", s))
    }
}

// ── Records ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub project_id: i64,
    pub user_id: i64,
    pub text: String,
    pub category: Category,
    pub completed: bool,
    pub subtasks: Vec<Subtask>,
    pub order: i32,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub project_type: String,
    pub tech_stack: TechStack,
    #[serde(default)]
    pub pinned: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentProject {
    pub project_id: i64,
    pub last_accessed: String,
}

/// Per-user pointer to the active project plus the most-recently-used list
/// (most recent first, at most [`RECENT_PROJECTS_LIMIT`] entries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProject {
    pub user_id: i64,
    pub current_project_id: Option<i64>,
    pub recent_projects: Vec<RecentProject>,
}

/// Technologies a user knows, avoids, or wants to try. Fed to task generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechBackground {
    #[serde(default)]
    pub known_tech: Vec<String>,
    #[serde(default)]
    pub disliked_tech: Vec<String>,
    #[serde(default)]
    pub starred_tech: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub background: TechBackground,
    pub created_at: String,
}

/// An improved project description returned by the enhancement service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enhancement {
    pub enhanced_description: String,
    #[serde(default)]
    pub suggested_features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for s in &["setup", "frontend", "backend", "testing", "deploy", "maintain"] {
            let parsed: Category = s.parse().unwrap();
            assert_eq!(parsed.as_str(), *s);
        }
        assert!(matches!(
            "invalid".parse::<Category>(),
            Err(CategoryError::Unknown(_))
        ));
    }

    #[test]
    fn test_planning_category_is_unsupported_not_unknown() {
        let err = "planning".parse::<Category>().unwrap_err();
        assert_eq!(err, CategoryError::Unsupported("planning".to_string()));
        assert!(err.to_string().contains("planning"));
    }

    #[test]
    fn test_category_display_order() {
        let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            vec!["setup", "frontend", "backend", "testing", "deploy", "maintain"]
        );
    }

    #[test]
    fn test_priority_parses_long_labels() {
        assert_eq!(
            "Speed (Ship fast, even if basic)".parse::<Priority>().unwrap(),
            Priority::Speed
        );
        assert_eq!("scalability".parse::<Priority>().unwrap(), Priority::Scalability);
        assert_eq!(
            Priority::Learning.label().parse::<Priority>().unwrap(),
            Priority::Learning
        );
        assert!("".parse::<Priority>().is_err());
        assert!("Cheap".parse::<Priority>().is_err());
    }

    #[test]
    fn test_task_id_resolve_single_field() {
        let id = TaskId::resolve([None, Some("abc".to_string()), None]).unwrap();
        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn test_task_id_resolve_agreeing_fields() {
        let id = TaskId::resolve([
            Some("task-1".to_string()),
            None,
            Some("task-1".to_string()),
        ])
        .unwrap();
        assert_eq!(id, TaskId::from("task-1"));
    }

    #[test]
    fn test_task_id_resolve_rejects_conflicts() {
        let err = TaskId::resolve([
            Some("task-1".to_string()),
            Some("65f0c2".to_string()),
            None,
        ])
        .unwrap_err();
        assert!(matches!(err, TaskIdError::Ambiguous { .. }));
    }

    #[test]
    fn test_task_id_resolve_ignores_blank_and_reports_missing() {
        let err = TaskId::resolve([Some("  ".to_string()), None, None]).unwrap_err();
        assert_eq!(err, TaskIdError::Missing);
    }

    #[test]
    fn test_task_serializes_camel_case() {
        let task = Task {
            id: TaskId::from("t1"),
            project_id: 3,
            user_id: 1,
            text: "Init repo".into(),
            category: Category::Setup,
            completed: false,
            subtasks: vec![],
            order: 0,
            created_at: "2024-01-01 00:00:00".into(),
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], "t1");
        assert_eq!(json["projectId"], 3);
        assert_eq!(json["category"], "setup");
    }
}
