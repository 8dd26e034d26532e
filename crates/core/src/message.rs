//! Transcript domain types.
//!
//! A transcript is the ordered list of [`Message`]s sent to the model on every
//! turn: system instructions, conversation history, the new user utterance,
//! and the assistant/tool exchanges produced by the reasoning loop.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::TranscriptError;

/// The role of a message sender in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (base prompt, language directive)
    System,
    /// The end user
    User,
    /// The model
    Assistant,
    /// Skill execution result
    Tool,
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this message
    pub role: Role,

    /// The text content; `None` when an assistant message only carries tool calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn new(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, Some(content.into()))
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, Some(content.into()))
    }

    /// Create a new assistant message without tool calls.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Some(content.into()))
    }

    /// Create an assistant message that requests tool calls.
    pub fn assistant_with_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, Some(content.into()))
        }
    }

    /// The text content, or `""` when there is none.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A model-issued request to invoke a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation token, unique within one loop execution
    pub id: String,

    /// Name of the skill to invoke
    pub name: String,

    /// Serialized arguments; only the skill interprets them
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Check that every tool message answers exactly one earlier tool call.
pub fn validate_transcript(messages: &[Message]) -> Result<(), TranscriptError> {
    let mut requested: HashSet<&str> = HashSet::new();
    let mut answered: HashSet<&str> = HashSet::new();

    for (position, message) in messages.iter().enumerate() {
        match message.role {
            Role::Assistant => {
                requested.extend(message.tool_calls.iter().map(|c| c.id.as_str()));
            }
            Role::Tool => {
                let call_id = message
                    .tool_call_id
                    .as_deref()
                    .ok_or(TranscriptError::MissingToolCallId { position })?;
                if !requested.contains(call_id) {
                    return Err(TranscriptError::OrphanToolResult {
                        call_id: call_id.to_string(),
                    });
                }
                if !answered.insert(call_id) {
                    return Err(TranscriptError::DuplicateToolResult {
                        call_id: call_id.to_string(),
                    });
                }
            }
            Role::System | Role::User => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "Hello, agent!");
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn tool_only_assistant_message_has_no_content() {
        let msg = Message::assistant_with_tool_calls(
            None,
            vec![ToolCall::new("call_1", "echo", r#"{"text":"hi"}"#)],
        );
        assert_eq!(msg.content, None);
        assert_eq!(msg.text(), "");
        assert!(msg.has_tool_calls());
    }

    #[test]
    fn serialization_skips_empty_fields() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);

        let json = serde_json::to_string(&Message::tool_result("call_1", "ok")).unwrap();
        assert!(json.contains(r#""role":"tool""#));
        assert!(json.contains(r#""tool_call_id":"call_1""#));
    }

    #[test]
    fn valid_transcript_passes() {
        let transcript = vec![
            Message::system("be brief"),
            Message::user("hi"),
            Message::assistant_with_tool_calls(
                None,
                vec![
                    ToolCall::new("a", "echo", "{}"),
                    ToolCall::new("b", "echo", "{}"),
                ],
            ),
            Message::tool_result("a", "one"),
            Message::tool_result("b", "two"),
            Message::assistant("done"),
        ];
        assert_eq!(validate_transcript(&transcript), Ok(()));
    }

    #[test]
    fn orphan_tool_result_is_rejected() {
        let transcript = vec![Message::user("hi"), Message::tool_result("ghost", "boo")];
        assert_eq!(
            validate_transcript(&transcript),
            Err(TranscriptError::OrphanToolResult {
                call_id: "ghost".into()
            })
        );
    }

    #[test]
    fn tool_result_before_its_call_is_rejected() {
        let transcript = vec![
            Message::tool_result("a", "early"),
            Message::assistant_with_tool_calls(None, vec![ToolCall::new("a", "echo", "{}")]),
        ];
        assert!(matches!(
            validate_transcript(&transcript),
            Err(TranscriptError::OrphanToolResult { .. })
        ));
    }

    #[test]
    fn duplicate_tool_result_is_rejected() {
        let transcript = vec![
            Message::assistant_with_tool_calls(None, vec![ToolCall::new("a", "echo", "{}")]),
            Message::tool_result("a", "first"),
            Message::tool_result("a", "second"),
        ];
        assert!(matches!(
            validate_transcript(&transcript),
            Err(TranscriptError::DuplicateToolResult { .. })
        ));
    }

    #[test]
    fn tool_message_without_id_is_rejected() {
        let mut msg = Message::tool_result("a", "x");
        msg.tool_call_id = None;
        assert_eq!(
            validate_transcript(&[msg]),
            Err(TranscriptError::MissingToolCallId { position: 0 })
        );
    }
}
