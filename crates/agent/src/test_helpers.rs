//! Shared test doubles for loop, middleware and pipeline tests.

use async_trait::async_trait;
use clawpipe_core::{
    AgentContext, AgentOptions, ChatResponse, ChunkReceiver, Message, Provider, ProviderError,
    Skill, SkillParameter, SkillRegistry, SkillResult, StreamChunk, ToolCall, ToolCallDelta,
    ToolDefinition, ParameterType, parse_arguments,
};
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::stream_event::AgentStreamEvent;

/// One recorded provider call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Option<Vec<String>>,
}

/// A provider that replays scripted responses in order.
///
/// `chat` pops the next [`ChatResponse`]; `chat_stream` pops the next chunk
/// script, or replays the next `ChatResponse` as chunks when no scripts are
/// left. Running out of script is a provider error.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<ChatResponse>>,
    streams: Mutex<VecDeque<Vec<StreamChunk>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            streams: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers once with plain text.
    pub fn text(text: &str) -> Self {
        Self::new(vec![ChatResponse::text(text)])
    }

    /// A provider whose streaming turns follow the given chunk scripts.
    pub fn streaming(scripts: Vec<Vec<StreamChunk>>) -> Self {
        Self {
            streams: Mutex::new(scripts.into()),
            ..Self::new(vec![])
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Names of the tools advertised on call `index`.
    pub fn advertised_tools(&self, index: usize) -> Option<Vec<String>> {
        self.calls.lock().unwrap()[index].tools.clone()
    }

    /// The transcript the provider saw on call `index`.
    pub fn transcript(&self, index: usize) -> Vec<Message> {
        self.calls.lock().unwrap()[index].messages.clone()
    }

    fn record(&self, messages: &[Message], tools: Option<&[ToolDefinition]>) {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            tools: tools.map(|t| t.iter().map(|d| d.name.clone()).collect()),
        });
    }

    fn next_response(&self) -> Result<ChatResponse, ProviderError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::MalformedResponse("script exhausted".into()))
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        _cancel: &CancellationToken,
    ) -> Result<ChatResponse, ProviderError> {
        self.record(messages, tools);
        self.next_response()
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        _cancel: &CancellationToken,
    ) -> Result<ChunkReceiver, ProviderError> {
        self.record(messages, tools);

        let script = self.streams.lock().unwrap().pop_front();
        let chunks = match script {
            Some(chunks) => chunks,
            None => {
                let response = self.next_response()?;
                let mut chunks = Vec::new();
                if let Some(content) = response.content {
                    chunks.push(StreamChunk::text(content));
                }
                chunks.extend(response.tool_calls.into_iter().enumerate().map(
                    |(index, call)| {
                        StreamChunk::tool_call(ToolCallDelta {
                            index,
                            id: Some(call.id),
                            name: Some(call.name),
                            arguments: call.arguments,
                        })
                    },
                ));
                chunks.push(StreamChunk::done());
                chunks
            }
        };

        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            tx.send(Ok(chunk)).await.unwrap();
        }
        Ok(rx)
    }
}

/// A provider that never answers; only cancellation or a deadline ends the wait.
pub struct PendingProvider;

#[async_trait]
impl Provider for PendingProvider {
    fn name(&self) -> &str {
        "pending"
    }

    async fn chat(
        &self,
        _messages: &[Message],
        _tools: Option<&[ToolDefinition]>,
        _cancel: &CancellationToken,
    ) -> Result<ChatResponse, ProviderError> {
        std::future::pending().await
    }
}

#[derive(Deserialize)]
struct EchoArgs {
    text: String,
}

/// Echoes its `text` argument.
pub struct EchoSkill;

#[async_trait]
impl Skill for EchoSkill {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes back the input"
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        vec![SkillParameter::required(
            "text",
            ParameterType::String,
            "Text to echo",
        )]
    }

    async fn execute(&self, arguments: &str, _cancel: &CancellationToken) -> SkillResult {
        match parse_arguments::<EchoArgs>(arguments) {
            Ok(args) => SkillResult::success(args.text),
            Err(failure) => failure,
        }
    }
}

/// Always fails.
pub struct FailingSkill;

#[async_trait]
impl Skill for FailingSkill {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters(&self) -> Vec<SkillParameter> {
        Vec::new()
    }

    async fn execute(&self, _arguments: &str, _cancel: &CancellationToken) -> SkillResult {
        SkillResult::failure("disk on fire")
    }
}

/// A seeded context without a system prompt.
pub fn context_with(
    provider: Arc<dyn Provider>,
    skills: Vec<Arc<dyn Skill>>,
    max_iterations: u32,
    input: &str,
) -> AgentContext {
    let options = AgentOptions {
        max_iterations,
        ..AgentOptions::default()
    };
    let skills = SkillRegistry::from_skills(skills).unwrap();
    let mut ctx = AgentContext::new(input, provider, skills, options);
    ctx.seed(None, &[]);
    ctx
}

/// An `echo` tool call with the given text.
pub fn echo_call(id: &str, text: &str) -> ToolCall {
    ToolCall::new(id, "echo", serde_json::json!({ "text": text }).to_string())
}

/// Collect every event until the sender side closes.
pub async fn drain(mut rx: mpsc::Receiver<AgentStreamEvent>) -> Vec<AgentStreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}
