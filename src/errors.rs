//! Typed error hierarchy for learnstack.
//!
//! Two top-level enums cover the two halves of the crate:
//! - `PlannerError`: server-side API, persistence and AI-service failures
//! - `ClientError`: client-side store, sync, form and enhancement failures

use thiserror::Error;

use crate::client::form::FormErrors;
use crate::models::{CategoryError, TaskId, TaskIdError};
use crate::server::ai::AiServiceError;

/// Errors from the REST server and its collaborators.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Project {id} not found")]
    ProjectNotFound { id: i64 },

    #[error("Task {id} not found")]
    TaskNotFound { id: String },

    #[error("User {id} not found")]
    UserNotFound { id: i64 },

    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    InvalidCategory(#[from] CategoryError),

    #[error("AI service error: {0}")]
    AiService(#[from] AiServiceError),

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors surfaced by the client half.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server responded with {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Task {id} not found in current task list")]
    TaskNotFound { id: TaskId },

    #[error(transparent)]
    TaskId(#[from] TaskIdError),

    #[error(transparent)]
    Category(#[from] CategoryError),

    #[error("Request cancelled")]
    Cancelled,

    #[error("An enhancement request is already in flight")]
    EnhanceInFlight,

    #[error("Input too short: {actual} characters, need at least {min}")]
    InputTooShort { min: usize, actual: usize },

    #[error("Invalid form: {0}")]
    Validation(FormErrors),

    #[error("Local storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl ClientError {
    /// Short text for a user-facing alert.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Could not reach the server. Please try again.".to_string(),
            Self::Http { message, .. } | Self::Rejected(message) if !message.is_empty() => {
                message.clone()
            }
            Self::Http { .. } | Self::Rejected(_) | Self::InvalidResponse(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planner_error_project_not_found_carries_id() {
        let err = PlannerError::ProjectNotFound { id: 42 };
        match &err {
            PlannerError::ProjectNotFound { id } => assert_eq!(*id, 42),
            _ => panic!("Expected ProjectNotFound"),
        }
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn planner_error_converts_from_category_error() {
        let err: PlannerError = CategoryError::Unsupported("planning".into()).into();
        match &err {
            PlannerError::InvalidCategory(CategoryError::Unsupported(c)) => {
                assert_eq!(c, "planning")
            }
            _ => panic!("Expected InvalidCategory(Unsupported)"),
        }
    }

    #[test]
    fn planner_error_converts_from_anyhow() {
        let err: PlannerError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, PlannerError::Other(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn client_error_converts_from_task_id_error() {
        let err: ClientError = TaskIdError::Missing.into();
        assert!(matches!(err, ClientError::TaskId(TaskIdError::Missing)));
    }

    #[test]
    fn client_error_user_message_prefers_server_text() {
        let err = ClientError::Http {
            status: 502,
            message: "AI service unavailable".into(),
        };
        assert_eq!(err.user_message(), "AI service unavailable");

        let blank = ClientError::Http {
            status: 500,
            message: String::new(),
        };
        assert_eq!(blank.user_message(), "Something went wrong. Please try again.");

        let net = ClientError::Network("connection refused".into());
        assert!(net.user_message().contains("Could not reach"));
    }

    #[test]
    fn client_error_input_too_short_display() {
        let err = ClientError::InputTooShort { min: 10, actual: 3 };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains('3'));
    }
}
