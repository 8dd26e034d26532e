//! Skill trait: the abstraction over agent capabilities.
//!
//! Skills are what give the agent the ability to act: read files, run
//! commands, fetch URLs, and so on. Each skill declares its parameters
//! explicitly, so the schema advertised to the model is known statically.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::provider::ToolDefinition;

/// JSON type of a declared skill parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// One declared parameter of a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillParameter {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: ParameterType,

    pub description: String,

    #[serde(default)]
    pub required: bool,
}

impl SkillParameter {
    /// A parameter the model must always supply.
    pub fn required(
        name: impl Into<String>,
        kind: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        }
    }

    /// A parameter the model may omit.
    pub fn optional(
        name: impl Into<String>,
        kind: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Build the JSON object schema advertised for a parameter list.
pub fn parameters_schema(parameters: &[SkillParameter]) -> serde_json::Value {
    let properties: serde_json::Map<String, serde_json::Value> = parameters
        .iter()
        .map(|p| {
            (
                p.name.clone(),
                serde_json::json!({
                    "type": p.kind.as_str(),
                    "description": p.description,
                }),
            )
        })
        .collect();
    let required: Vec<&str> = parameters
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name.as_str())
        .collect();

    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Outcome of a skill execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "lowercase")]
pub enum SkillResult {
    Success(String),
    Failure(String),
}

impl SkillResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self::Success(output.into())
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure(error.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Success(output) => Some(output),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }

    /// The text fed back to the model as a Tool message.
    pub fn into_tool_content(self) -> String {
        match self {
            Self::Success(output) => output,
            Self::Failure(error) => format!("Error: {error}"),
        }
    }
}

/// The core Skill trait.
///
/// A skill receives its arguments as one opaque serialized string and is
/// solely responsible for parsing them. Malformed input must come back as
/// [`SkillResult::Failure`], never as a panic.
#[async_trait]
pub trait Skill: Send + Sync {
    /// The unique name of this skill (e.g., "file_read", "web_fetch").
    fn name(&self) -> &str;

    /// A description of what this skill does (sent to the LLM).
    fn description(&self) -> &str;

    /// Declared parameters, in advertisement order.
    fn parameters(&self) -> Vec<SkillParameter>;

    /// Execute the skill with the given serialized arguments.
    async fn execute(&self, arguments: &str, cancel: &CancellationToken) -> SkillResult;

    /// Convert this skill into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: parameters_schema(&self.parameters()),
        }
    }
}

/// Deserialize skill arguments, folding parse errors into a failure result.
///
/// An empty payload is read as `{}` so skills without required parameters
/// accept a bare call.
pub fn parse_arguments<T: DeserializeOwned>(raw: &str) -> Result<T, SkillResult> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    serde_json::from_str(raw).map_err(|e| SkillResult::failure(format!("Invalid arguments: {e}")))
}
