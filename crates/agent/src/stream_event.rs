//! Agent-level streaming events.
//!
//! `AgentStreamEvent` is the vocabulary a front end receives while an
//! execution runs. Transport framing (SSE, WebSocket, CLI) belongs to the
//! host; it only has to preserve emission order.

use clawpipe_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Capacity of the event channel between an execution and its consumer.
pub const EVENT_BUFFER: usize = 128;

/// Events emitted during a streaming execution.
///
/// Serialized with a `type` tag:
/// - `thinking`: a provider call is about to start
/// - `tool_executing`: a skill is about to run
/// - `tool_completed`: the skill finished (output or error text)
/// - `content_delta`: partial text from the LLM
/// - `completed`: terminal; the full answer
/// - `error`: terminal; a user-safe failure description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    Thinking,

    ToolExecuting { tool_name: String },

    ToolCompleted { tool_name: String, content: String },

    ContentDelta { content: String },

    Completed { content: String },

    Error { content: String },
}

impl AgentStreamEvent {
    /// Event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Thinking => "thinking",
            Self::ToolExecuting { .. } => "tool_executing",
            Self::ToolCompleted { .. } => "tool_completed",
            Self::ContentDelta { .. } => "content_delta",
            Self::Completed { .. } => "completed",
            Self::Error { .. } => "error",
        }
    }

    /// `Completed` and `Error` end a sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Error { .. })
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Self::ToolCompleted { content, .. }
            | Self::ContentDelta { content }
            | Self::Completed { content }
            | Self::Error { content } => Some(content),
            Self::Thinking | Self::ToolExecuting { .. } => None,
        }
    }

    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Self::ToolExecuting { tool_name } | Self::ToolCompleted { tool_name, .. } => {
                Some(tool_name)
            }
            _ => None,
        }
    }

    pub(crate) fn error(content: impl Into<String>) -> Self {
        Self::Error {
            content: content.into(),
        }
    }
}

/// Producer half of an event stream.
///
/// Sending fails with [`Error::StreamClosed`] once the consumer drops its
/// receiver, which is how an abandoned stream stops its execution.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<AgentStreamEvent>,
}

impl EventSender {
    pub fn new(tx: mpsc::Sender<AgentStreamEvent>) -> Self {
        Self { tx }
    }

    /// A bounded sender/receiver pair.
    pub fn channel() -> (Self, mpsc::Receiver<AgentStreamEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (Self::new(tx), rx)
    }

    pub async fn emit(&self, event: AgentStreamEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::StreamClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
