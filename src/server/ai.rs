//! Client for the external task-generation / idea-enhancement service.
//!
//! The service is opaque: we send a description (plus priority and the
//! user's technology background for generation) and get back loosely shaped
//! JSON, which is validated and normalized here before anything is stored.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{Enhancement, TechBackground};
use crate::tech_stack::{TechStack, normalize_tech_stack};

#[derive(Debug, Clone, Error)]
pub enum AiServiceError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("json error: {0}")]
    Serde(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

fn map_reqwest_error(e: reqwest::Error) -> AiServiceError {
    if e.is_timeout() {
        AiServiceError::Timeout
    } else {
        AiServiceError::Transport(e.to_string())
    }
}

/// Body of `POST /api/generate-tasks` on the AI service.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateTasksRequest {
    pub description: String,
    pub priority: String,
    pub background: TechBackground,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiSubtask {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// A task as emitted by the service, before category validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiTask {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<AiSubtask>,
}

/// A generation result with the tech stack already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPlan {
    pub tasks: Vec<AiTask>,
    pub tech_stack: TechStack,
    pub project_type: Option<String>,
}

impl GeneratedPlan {
    /// Parse a raw service response. `data` must be an array of tasks; the
    /// tech stack may come in any of its historical shapes.
    pub fn from_value(value: Value) -> Result<Self, AiServiceError> {
        let data = value
            .get("data")
            .cloned()
            .ok_or_else(|| AiServiceError::InvalidResponse("missing `data` array".into()))?;
        if !data.is_array() {
            return Err(AiServiceError::InvalidResponse(
                "`data` is not an array".into(),
            ));
        }
        let tasks: Vec<AiTask> =
            serde_json::from_value(data).map_err(|e| AiServiceError::Serde(e.to_string()))?;

        let project_type = value
            .get("project_type")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            tasks,
            tech_stack: normalize_tech_stack(&value),
            project_type,
        })
    }
}

/// Parse the enhancement response, accepting snake or camel case keys.
/// When no feature list is given, bullet points under a features heading
/// in the enhanced text are used instead.
pub fn parse_enhancement(value: &Value) -> Result<Enhancement, AiServiceError> {
    let enhanced_description = ["enhanced_description", "enhancedDescription"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AiServiceError::InvalidResponse("missing enhanced description".into()))?
        .to_string();

    let listed: Vec<String> = ["suggested_features", "suggestedFeatures"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let suggested_features = if listed.is_empty() {
        extract_features(&enhanced_description)
    } else {
        listed
    };

    Ok(Enhancement {
        enhanced_description,
        suggested_features,
    })
}

static FEATURES_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:key\s+)?features\s*:[ \t]*").expect("valid features regex")
});

static SECTION_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Za-z /]*:").expect("valid heading regex")
});

/// Collect the bullet lines that follow a `Features:` (or `Key Features:`)
/// heading, stopping at the next section heading.
pub fn extract_features(text: &str) -> Vec<String> {
    let Some(heading) = FEATURES_HEADING.find(text) else {
        return Vec::new();
    };

    let mut features = Vec::new();
    for line in text[heading.end()..].lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line
            .strip_prefix('-')
            .or_else(|| line.strip_prefix('*'))
            .or_else(|| line.strip_prefix('•'))
        {
            let item = rest.trim();
            if !item.is_empty() {
                features.push(item.to_string());
            }
        } else if SECTION_HEADING.is_match(line) || !features.is_empty() {
            break;
        }
    }
    features
}

/// The generation service as seen by the API handlers.
#[async_trait]
pub trait AiService: Send + Sync {
    async fn generate_tasks(
        &self,
        request: &GenerateTasksRequest,
    ) -> Result<GeneratedPlan, AiServiceError>;

    async fn enhance_idea(&self, description: &str) -> Result<Enhancement, AiServiceError>;

    /// Whether the service answers its health probe.
    async fn health(&self) -> bool;
}

/// HTTP implementation of [`AiService`].
#[derive(Debug, Clone)]
pub struct HttpAiService {
    http: Client,
    base_url: String,
}

impl HttpAiService {
    const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

    /// `timeout` bounds each generation/enhancement call; `None` waits as
    /// long as the service takes.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, AiServiceError> {
        let mut builder =
            Client::builder().user_agent(concat!("learnstack/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| AiServiceError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, AiServiceError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::warn!(%url, status = status.as_u16(), "AI service returned an error");
            return Err(AiServiceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        res.json::<Value>()
            .await
            .map_err(|e| AiServiceError::Serde(e.to_string()))
    }
}

#[async_trait]
impl AiService for HttpAiService {
    async fn generate_tasks(
        &self,
        request: &GenerateTasksRequest,
    ) -> Result<GeneratedPlan, AiServiceError> {
        let value = self.post_json("/api/generate-tasks", request).await?;
        let plan = GeneratedPlan::from_value(value)?;
        tracing::debug!(tasks = plan.tasks.len(), "AI service generated tasks");
        Ok(plan)
    }

    async fn enhance_idea(&self, description: &str) -> Result<Enhancement, AiServiceError> {
        let body = serde_json::json!({ "description": description });
        let value = self.post_json("/api/enhance-idea", &body).await?;
        parse_enhancement(&value)
    }

    async fn health(&self) -> bool {
        let url = format!("{}/api/health", self.base_url);
        match self
            .http
            .get(&url)
            .timeout(Self::HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(res) => res.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "AI service health probe failed");
                false
            }
        }
    }
}
