//! The agent execution pipeline: the heart of ClawPipe.
//!
//! The agent follows an **Ask → Act → Observe** cycle:
//!
//! 1. **Seed** the transcript (system prompt + history + user message)
//! 2. **Send to LLM** via the provider resolved for this execution
//! 3. **If tool calls**: run the skills one by one, append results, loop back to step 2
//! 4. **If text response**: return it (buffered) or emit `Completed` (streaming)
//!
//! The loop continues until the LLM responds with text only (no tool calls)
//! or the iteration budget is exhausted. Around it sits an ordered
//! [`middleware`] chain: error containment, secret redaction, logging and a
//! hard deadline.

pub mod loop_runner;
pub mod middleware;
pub mod pipeline;
pub mod prompt;
pub mod protocol;
pub mod slash;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use loop_runner::MAX_ITERATIONS_MESSAGE;
pub use middleware::{
    ErrorHandlingMiddleware, LoggingMiddleware, Middleware, Next, SecretRedactionMiddleware,
    TimeoutMiddleware,
};
pub use pipeline::{AgentPipeline, PipelineBuilder};
pub use prompt::{Language, compose_system_prompt};
pub use protocol::{ProtocolViolation, StreamCollector, StreamOutcome};
pub use slash::{SlashCommand, normalize_arguments};
pub use stream_event::{AgentStreamEvent, EventSender};
