//! The agent reasoning loop implementation.
//!
//! Two modes share the same transcript rules and iteration bound:
//! [`run`] returns one final string, [`run_stream`] emits
//! [`AgentStreamEvent`]s as it goes. Both expect an already seeded
//! [`AgentContext`].

use clawpipe_core::{
    AgentContext, ChatResponse, Error, Message, Result, SkillRegistry, ToolCall,
    ToolCallAccumulator, ToolDefinition,
};
use std::future::Future;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::stream_event::{AgentStreamEvent, EventSender};

/// Returned (buffered) or emitted as `Error` (streaming) when the iteration
/// budget runs out before the model gives a tool-free answer.
pub const MAX_ITERATIONS_MESSAGE: &str =
    "I've reached the maximum number of tool call iterations. Please provide further guidance.";

/// Race `fut` against the cancellation signal.
async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        out = fut => Ok(out),
    }
}

fn catalog(tools: &[ToolDefinition]) -> Option<&[ToolDefinition]> {
    (!tools.is_empty()).then_some(tools)
}

/// Run the buffered loop to completion.
///
/// The only success exit is a provider response without tool calls; budget
/// exhaustion returns [`MAX_ITERATIONS_MESSAGE`]. Provider failures and
/// cancellation propagate as `Err`.
pub async fn run(ctx: &mut AgentContext, cancel: &CancellationToken) -> Result<String> {
    let provider = ctx.provider.clone();
    let max_iterations = ctx.options.max_iterations;

    for iteration in 1..=max_iterations {
        debug!(
            iteration,
            max_iterations,
            messages = ctx.messages.len(),
            "Agent loop iteration"
        );

        let tools = ctx.tool_definitions();
        let response = until_cancelled(
            cancel,
            provider.chat(&ctx.messages, catalog(&tools), cancel),
        )
        .await??;

        if !response.has_tool_calls() {
            let text = response.content.unwrap_or_default();
            ctx.messages.push(Message::assistant(text.clone()));
            info!(iterations = iteration, "Agent produced final answer");
            return Ok(text);
        }

        let ChatResponse {
            content,
            tool_calls,
        } = response;
        debug!(tool_count = tool_calls.len(), "Executing tool calls");
        ctx.messages
            .push(Message::assistant_with_tool_calls(content, tool_calls.clone()));

        // Strictly sequential: results only become visible on the next turn.
        for call in &tool_calls {
            let output = dispatch(&ctx.skills, call, cancel).await?;
            ctx.messages.push(Message::tool_result(&call.id, output));
        }
    }

    warn!(max_iterations, "Max tool iterations reached");
    Ok(MAX_ITERATIONS_MESSAGE.to_string())
}

/// Run the streaming loop, emitting events into `events`.
///
/// Emits exactly one terminal event when it returns `Ok`; on `Err` nothing
/// terminal has been sent and the caller reports the failure.
pub async fn run_stream(
    ctx: &mut AgentContext,
    cancel: &CancellationToken,
    events: &EventSender,
) -> Result<()> {
    let provider = ctx.provider.clone();
    let max_iterations = ctx.options.max_iterations;
    // Every delta emitted in this execution, so `Completed` matches their
    // concatenation even when earlier tool-calling turns also streamed text.
    let mut streamed = String::new();

    for iteration in 1..=max_iterations {
        debug!(iteration, max_iterations, "Agent stream iteration");
        events.emit(AgentStreamEvent::Thinking).await?;

        let tools = ctx.tool_definitions();
        let mut chunks = until_cancelled(
            cancel,
            provider.chat_stream(&ctx.messages, catalog(&tools), cancel),
        )
        .await??;

        let mut turn_text = String::new();
        let mut pending = ToolCallAccumulator::new();

        while let Some(chunk) = until_cancelled(cancel, chunks.recv()).await? {
            let chunk = chunk?;

            if let Some(text) = chunk.content
                && !text.is_empty()
            {
                turn_text.push_str(&text);
                streamed.push_str(&text);
                events
                    .emit(AgentStreamEvent::ContentDelta { content: text })
                    .await?;
            }

            if let Some(delta) = chunk.tool_call {
                pending.push(delta);
            }

            if chunk.done {
                break;
            }
        }

        if pending.is_empty() {
            ctx.messages.push(Message::assistant(turn_text));
            info!(iterations = iteration, "Agent stream produced final answer");
            events
                .emit(AgentStreamEvent::Completed { content: streamed })
                .await?;
            return Ok(());
        }

        let tool_calls = pending.finish();
        debug!(tool_count = tool_calls.len(), "Executing streamed tool calls");
        ctx.messages.push(Message::assistant_with_tool_calls(
            Some(turn_text).filter(|t| !t.is_empty()),
            tool_calls.clone(),
        ));

        for call in &tool_calls {
            events
                .emit(AgentStreamEvent::ToolExecuting {
                    tool_name: call.name.clone(),
                })
                .await?;

            let output = dispatch(&ctx.skills, call, cancel).await?;
            ctx.messages.push(Message::tool_result(&call.id, output.clone()));

            events
                .emit(AgentStreamEvent::ToolCompleted {
                    tool_name: call.name.clone(),
                    content: output,
                })
                .await?;
        }
    }

    warn!(max_iterations, "Max tool iterations reached while streaming");
    events
        .emit(AgentStreamEvent::error(MAX_ITERATIONS_MESSAGE))
        .await
}

/// Resolve and run one tool call, producing the Tool message content.
///
/// Unknown skills and skill failures become error-shaped text the model
/// sees on its next turn; only cancellation is an `Err`.
pub async fn dispatch(
    skills: &SkillRegistry,
    call: &ToolCall,
    cancel: &CancellationToken,
) -> Result<String> {
    let Some(skill) = skills.get(&call.name) else {
        warn!(skill = %call.name, call_id = %call.id, "Model requested unknown skill");
        return Ok(format!("Error: Skill '{}' not found.", call.name));
    };

    let start = Instant::now();
    let result = until_cancelled(cancel, skill.execute(&call.arguments, cancel)).await?;
    let duration_ms = start.elapsed().as_millis() as u64;

    match result.error() {
        Some(error) => warn!(skill = %call.name, duration_ms, error, "Skill execution failed"),
        None => debug!(skill = %call.name, duration_ms, "Skill executed"),
    }

    Ok(result.into_tool_content())
}
