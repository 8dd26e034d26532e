//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send a transcript (plus the catalog of callable
//! tools) to a model and get a response back, either as a complete message
//! or as a stream of incremental chunks.
//!
//! Vendor clients are external collaborators; the pipeline only relies on
//! the contract below.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::ProviderError;
use crate::message::{Message, ToolCall};

/// A tool definition sent to the LLM so it knows what skills it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The skill name
    pub name: String,

    /// Description of what the skill does
    pub description: String,

    /// JSON Schema describing the skill's parameters
    pub parameters: serde_json::Value,
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated text, if any
    #[serde(default)]
    pub content: Option<String>,

    /// Requested tool calls; empty means "no tool calls"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl ChatResponse {
    /// A plain text answer.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// A turn that requests tools, with no accompanying text.
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A fragment of a tool call delivered while streaming.
///
/// Fragments sharing an `index` belong to the same call; `arguments`
/// fragments are concatenated in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub arguments: String,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Partial tool call data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallDelta>,

    /// Whether the provider finished this turn
    #[serde(default)]
    pub done: bool,
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn tool_call(delta: ToolCallDelta) -> Self {
        Self {
            tool_call: Some(delta),
            ..Self::default()
        }
    }

    pub fn done() -> Self {
        Self {
            done: true,
            ..Self::default()
        }
    }
}

/// Receiving half of a streaming provider call.
pub type ChunkReceiver = mpsc::Receiver<Result<StreamChunk, ProviderError>>;

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The agent loop calls `chat()` or
/// `chat_stream()` without knowing which backend is being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama", "openai").
    fn name(&self) -> &str;

    /// Send the transcript and get a complete response.
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, ProviderError>;

    /// Send the transcript and get a stream of response chunks.
    ///
    /// Default implementation calls `chat()` and replays the result as one
    /// content chunk, one chunk per tool call, and a final `done` chunk.
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        cancel: &CancellationToken,
    ) -> Result<ChunkReceiver, ProviderError> {
        let response = self.chat(messages, tools, cancel).await?;
        let (tx, rx) = mpsc::channel(response.tool_calls.len() + 2);

        if let Some(content) = response.content.filter(|c| !c.is_empty()) {
            let _ = tx.send(Ok(StreamChunk::text(content))).await;
        }
        for (index, call) in response.tool_calls.into_iter().enumerate() {
            let _ = tx
                .send(Ok(StreamChunk::tool_call(ToolCallDelta {
                    index,
                    id: Some(call.id),
                    name: Some(call.name),
                    arguments: call.arguments,
                })))
                .await;
        }
        let _ = tx.send(Ok(StreamChunk::done())).await;

        Ok(rx)
    }
}

/// Resolves the provider an execution should talk to.
///
/// Called once at the start of every execution; the result is kept for the
/// whole reasoning loop even if the configuration changes meanwhile.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn provider(&self) -> Result<Arc<dyn Provider>, ProviderError>;
}

/// A factory that always hands out the same provider.
pub struct FixedProviderFactory {
    provider: Arc<dyn Provider>,
}

impl FixedProviderFactory {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ProviderFactory for FixedProviderFactory {
    async fn provider(&self) -> Result<Arc<dyn Provider>, ProviderError> {
        Ok(self.provider.clone())
    }
}

/// Reassembles streamed tool-call fragments into complete [`ToolCall`]s.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    partial: BTreeMap<usize, PartialToolCall>,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one fragment into the call at its index.
    pub fn push(&mut self, delta: ToolCallDelta) {
        let entry = self.partial.entry(delta.index).or_default();
        if entry.id.is_none() {
            entry.id = delta.id.filter(|id| !id.is_empty());
        }
        if let Some(name) = delta.name {
            entry.name.push_str(&name);
        }
        entry.arguments.push_str(&delta.arguments);
    }

    pub fn is_empty(&self) -> bool {
        self.partial.is_empty()
    }

    /// Finalize all calls in index order.
    ///
    /// Calls the provider left without an id get a generated one; empty
    /// argument payloads become `{}`.
    pub fn finish(self) -> Vec<ToolCall> {
        self.partial
            .into_values()
            .map(|partial| ToolCall {
                id: partial
                    .id
                    .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple())),
                name: partial.name,
                arguments: if partial.arguments.trim().is_empty() {
                    "{}".to_string()
                } else {
                    partial.arguments
                },
            })
            .collect()
    }
}
