//! The new-project form: field validation and submission.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::api::{GenerateTasksBody, PlannerApi};
use super::draft::DraftStore;
use super::store::Store;
use super::{Notifier, View};
use crate::errors::ClientError;
use crate::models::{DEFAULT_PROJECT_TYPE, Priority, Project};

/// Raw form input, exactly as typed. This is also the persisted draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Name,
    Description,
    Priority,
}

impl FormField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Priority => "priority",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-field validation messages. Only failing fields have an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<FormField, String>);

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = FormField> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> + '_ {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    fn insert(&mut self, field: FormField, message: &str) {
        self.0.insert(field, message.to_string());
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(field, msg)| format!("{field}: {msg}")).collect();
        f.write_str(&parts.join("; "))
    }
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidForm {
    pub name: String,
    pub description: String,
    pub priority: Priority,
}

impl ProjectForm {
    pub fn validate(&self) -> Result<ValidForm, FormErrors> {
        let mut errors = FormErrors::default();
        let name = self.name.trim();
        let description = self.description.trim();
        let priority = self.priority.trim();

        if name.is_empty() {
            errors.insert(FormField::Name, "Project name is required");
        }
        if description.is_empty() {
            errors.insert(FormField::Description, "Project description is required");
        }
        let parsed = if priority.is_empty() {
            errors.insert(FormField::Priority, "Please select a priority");
            None
        } else {
            match priority.parse::<Priority>() {
                Ok(p) => Some(p),
                Err(_) => {
                    errors.insert(FormField::Priority, "Please select a valid priority");
                    None
                }
            }
        };

        match parsed {
            Some(priority) if errors.is_empty() => Ok(ValidForm {
                name: name.to_string(),
                description: description.to_string(),
                priority,
            }),
            _ => Err(errors),
        }
    }
}

/// Submits the form and updates client state with the generated project.
#[derive(Clone)]
pub struct ProjectCreation {
    api: Arc<dyn PlannerApi>,
    store: Store,
    drafts: DraftStore,
    notifier: Arc<dyn Notifier>,
}

impl ProjectCreation {
    pub fn new(
        api: Arc<dyn PlannerApi>,
        store: Store,
        drafts: DraftStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            store,
            drafts,
            notifier,
        }
    }

    /// Validate, generate, and switch to the new project's task view.
    ///
    /// Validation failures return before any request. A failed request alerts
    /// once and leaves the saved draft in place.
    pub async fn submit(&self, form: &ProjectForm) -> Result<View, ClientError> {
        let valid = form.validate().map_err(ClientError::Validation)?;
        let body = GenerateTasksBody {
            name: valid.name.clone(),
            description: valid.description.clone(),
            priority: valid.priority.label().to_string(),
        };

        self.store.set_loading(true);
        self.store.set_error(None);
        let result = self.api.generate_tasks(&body).await;
        self.store.set_loading(false);

        let generated = match result {
            Ok(generated) => generated,
            Err(e) => {
                tracing::error!(error = %e, "Project generation failed");
                self.store.set_error(Some(e.user_message()));
                self.notifier
                    .alert(&format!("Failed to create project: {}", e.user_message()));
                return Err(e);
            }
        };

        let project = Project {
            id: generated.project_id,
            user_id: self.store.current_user_id().unwrap_or_default(),
            name: generated.project_name.unwrap_or(valid.name),
            description: valid.description,
            priority: valid.priority,
            project_type: generated
                .project_type
                .unwrap_or_else(|| DEFAULT_PROJECT_TYPE.to_string()),
            tech_stack: generated.tech_stack,
            pinned: false,
            created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        tracing::info!(
            project_id = project.id,
            tasks = generated.tasks.len(),
            "Created project"
        );

        let project_id = project.id;
        self.store.set_current_project(project);
        self.store.set_tasks(generated.tasks);

        if let Err(e) = self.drafts.clear() {
            tracing::warn!(error = %e, "Failed to clear saved draft");
        }
        Ok(View::Tasks { project_id })
    }

    /// Discard the saved draft and return an empty form.
    pub fn reset(&self) -> Result<ProjectForm, ClientError> {
        self.drafts.clear().map_err(ClientError::Storage)?;
        Ok(ProjectForm::default())
    }
}
