//! Technology-stack recommendation keyed by project phase.
//!
//! The generation service has reported the recommendation in three shapes
//! over time: a nested object, the same object JSON-encoded into a string,
//! and the phase arrays spread flat over the top-level response. All three
//! are resolved once, here, into a [`TechStack`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::Category;

/// Response keys that may hold the nested recommendation, in lookup order.
const STACK_KEYS: [&str; 3] = ["tech_stack_recommendation", "tech_stack", "techStack"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechStack {
    #[serde(default)]
    pub setup: Vec<String>,
    #[serde(default)]
    pub frontend: Vec<String>,
    #[serde(default)]
    pub backend: Vec<String>,
    #[serde(default)]
    pub testing: Vec<String>,
    #[serde(default)]
    pub deploy: Vec<String>,
    #[serde(default)]
    pub maintain: Vec<String>,
}

impl TechStack {
    pub fn phase(&self, category: Category) -> &[String] {
        match category {
            Category::Setup => &self.setup,
            Category::Frontend => &self.frontend,
            Category::Backend => &self.backend,
            Category::Testing => &self.testing,
            Category::Deploy => &self.deploy,
            Category::Maintain => &self.maintain,
        }
    }

    fn phase_mut(&mut self, category: Category) -> &mut Vec<String> {
        match category {
            Category::Setup => &mut self.setup,
            Category::Frontend => &mut self.frontend,
            Category::Backend => &mut self.backend,
            Category::Testing => &mut self.testing,
            Category::Deploy => &mut self.deploy,
            Category::Maintain => &mut self.maintain,
        }
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.phase(*c).is_empty())
    }

    /// Read the six phase arrays out of a JSON object, ignoring anything else.
    ///
    /// Entries may be plain strings or objects with a `name` field; other
    /// values are skipped.
    fn from_object(map: &Map<String, Value>) -> Self {
        let mut stack = Self::default();
        for category in Category::ALL {
            let Some(Value::Array(items)) = map.get(category.as_str()) else {
                continue;
            };
            let names = items.iter().filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(o) => o.get("name").and_then(Value::as_str).map(str::to_string),
                _ => None,
            });
            stack
                .phase_mut(category)
                .extend(names.filter(|n| !n.is_empty()));
        }
        stack
    }
}

/// The shape a recommendation arrived in, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum TechStackPayload {
    /// `{"tech_stack": {"frontend": [...], ...}}`
    Object(Map<String, Value>),
    /// `{"tech_stack": "{\"frontend\": [...]}"}`
    Encoded(String),
    /// `{"frontend": [...], "backend": [...], ...}` at the top level.
    LegacyFlat(Map<String, Value>),
    Missing,
}

impl TechStackPayload {
    /// Detect which shape a whole service response carries.
    pub fn from_response(response: &Map<String, Value>) -> Self {
        for key in STACK_KEYS {
            match response.get(key) {
                Some(Value::Object(map)) => return Self::Object(map.clone()),
                Some(Value::String(raw)) => return Self::Encoded(raw.clone()),
                _ => {}
            }
        }

        let has_flat_phase = Category::ALL
            .iter()
            .any(|c| response.get(c.as_str()).is_some_and(Value::is_array));
        if has_flat_phase {
            Self::LegacyFlat(response.clone())
        } else {
            Self::Missing
        }
    }

    /// Resolve into a [`TechStack`]. Never fails: anything unreadable is the
    /// empty stack.
    pub fn normalize(self) -> TechStack {
        match self {
            Self::Object(map) | Self::LegacyFlat(map) => TechStack::from_object(&map),
            Self::Encoded(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => TechStack::from_object(&map),
                Ok(other) => {
                    tracing::warn!(
                        kind = json_kind(&other),
                        "Encoded tech stack is not an object, using empty stack"
                    );
                    TechStack::default()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to decode tech stack, using empty stack");
                    TechStack::default()
                }
            },
            Self::Missing => TechStack::default(),
        }
    }
}

/// Normalize the tech stack carried anywhere in a service response.
pub fn normalize_tech_stack(response: &Value) -> TechStack {
    match response {
        Value::Object(map) => TechStackPayload::from_response(map).normalize(),
        _ => TechStack::default(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
