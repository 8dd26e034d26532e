//! Per-execution agent state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::message::{Message, validate_transcript};
use crate::provider::{Provider, ToolDefinition};
use crate::registry::SkillRegistry;

/// Behavior knobs for the reasoning loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentOptions {
    /// Base system prompt prepended to every transcript
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Maximum provider round-trips per execution (safety limit)
    pub max_iterations: u32,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_iterations: 10,
        }
    }
}

/// Mutable state owned by exactly one execution.
///
/// The provider and skill set are resolved once when the context is built
/// and never re-resolved mid-loop.
pub struct AgentContext {
    /// The utterance that started this execution
    pub user_input: String,

    /// The growing transcript
    pub messages: Vec<Message>,

    /// Provider resolved for this execution
    pub provider: Arc<dyn Provider>,

    /// Snapshot of enabled skills
    pub skills: SkillRegistry,

    pub options: AgentOptions,

    /// Side channel for middleware-to-middleware data (timings, flags);
    /// never sent to the model.
    pub items: HashMap<String, serde_json::Value>,
}

impl AgentContext {
    pub fn new(
        user_input: impl Into<String>,
        provider: Arc<dyn Provider>,
        skills: SkillRegistry,
        options: AgentOptions,
    ) -> Self {
        Self {
            user_input: user_input.into(),
            messages: Vec::new(),
            provider,
            skills,
            options,
            items: HashMap::new(),
        }
    }

    /// Seed the transcript: system prompt (if any), prior history, then the
    /// new user message.
    pub fn seed(&mut self, system_prompt: Option<String>, history: &[Message]) {
        if let Err(e) = validate_transcript(history) {
            warn!(error = %e, "Conversation history breaks tool-call correlation");
        }

        self.messages.clear();
        if let Some(prompt) = system_prompt.filter(|p| !p.trim().is_empty()) {
            self.messages.push(Message::system(prompt));
        }
        self.messages.extend_from_slice(history);
        self.messages.push(Message::user(self.user_input.clone()));
    }

    /// Tool catalog derived fresh from the skill snapshot.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.skills.definitions()
    }
}

impl fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentContext")
            .field("user_input", &self.user_input)
            .field("messages", &self.messages.len())
            .field("provider", &self.provider.name())
            .field("skills", &self.skills)
            .field("options", &self.options)
            .field("items", &self.items)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::message::{Role, ToolCall};
    use crate::provider::ChatResponse;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct Silent;

    #[async_trait]
    impl Provider for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        async fn chat(
            &self,
            _messages: &[Message],
            _tools: Option<&[ToolDefinition]>,
            _cancel: &CancellationToken,
        ) -> Result<ChatResponse, ProviderError> {
            Ok(ChatResponse::default())
        }
    }

    fn context(input: &str) -> AgentContext {
        AgentContext::new(
            input,
            Arc::new(Silent),
            SkillRegistry::new(),
            AgentOptions::default(),
        )
    }

    #[test]
    fn options_default_to_ten_iterations() {
        let options = AgentOptions::default();
        assert_eq!(options.max_iterations, 10);
        assert!(options.system_prompt.is_none());
    }

    #[test]
    fn options_deserialize_partially() {
        let options: AgentOptions = serde_json::from_str(r#"{"system_prompt":"be brief"}"#).unwrap();
        assert_eq!(options.system_prompt.as_deref(), Some("be brief"));
        assert_eq!(options.max_iterations, 10);
    }

    #[test]
    fn seed_orders_system_history_user() {
        let mut ctx = context("what now?");
        let history = vec![Message::user("earlier"), Message::assistant("reply")];
        ctx.seed(Some("You are helpful.".into()), &history);

        let roles: Vec<Role> = ctx.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(ctx.messages[3].text(), "what now?");
    }

    #[test]
    fn seed_skips_blank_system_prompt() {
        let mut ctx = context("hi");
        ctx.seed(Some("   ".into()), &[]);
        assert_eq!(ctx.messages.len(), 1);
        assert_eq!(ctx.messages[0].role, Role::User);
    }

    #[test]
    fn seed_keeps_inconsistent_history() {
        let mut ctx = context("hi");
        let history = vec![
            Message::assistant_with_tool_calls(None, vec![ToolCall::new("a", "x", "{}")]),
            Message::tool_result("b", "orphan"),
        ];
        ctx.seed(None, &history);
        assert_eq!(ctx.messages.len(), 3);
    }
}
