//! Consumer-side view of the event protocol.
//!
//! [`StreamCollector`] is the state machine a front end runs over an
//! [`AgentStreamEvent`] sequence. It enforces the ordering rules:
//!
//! - `ToolExecuting` precedes its `ToolCompleted`, one tool at a time
//! - `Completed` content equals the concatenation of all `ContentDelta`s
//! - exactly one terminal event (`Completed` or `Error`), nothing after it

use thiserror::Error;
use tokio::sync::mpsc;

use crate::stream_event::AgentStreamEvent;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("'{event}' event arrived after the terminal event")]
    AfterTerminal { event: &'static str },

    #[error("tool '{next}' started while '{running}' was still running")]
    OverlappingTool { running: String, next: String },

    #[error("tool '{tool_name}' completed without having started")]
    UnmatchedCompletion { tool_name: String },

    #[error("completed content does not match the streamed deltas")]
    ContentMismatch,

    #[error("stream ended without a terminal event")]
    MissingTerminal,
}

/// How a well-formed stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed(String),
    Failed(String),
}

#[derive(Debug, Default)]
pub struct StreamCollector {
    text: String,
    turns: usize,
    running: Option<String>,
    tool_results: Vec<(String, String)>,
    terminal: Option<StreamOutcome>,
}

impl StreamCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next event, in arrival order.
    pub fn observe(&mut self, event: &AgentStreamEvent) -> Result<(), ProtocolViolation> {
        if self.terminal.is_some() {
            return Err(ProtocolViolation::AfterTerminal {
                event: event.event_type(),
            });
        }

        match event {
            AgentStreamEvent::Thinking => self.turns += 1,
            AgentStreamEvent::ToolExecuting { tool_name } => {
                if let Some(running) = &self.running {
                    return Err(ProtocolViolation::OverlappingTool {
                        running: running.clone(),
                        next: tool_name.clone(),
                    });
                }
                self.running = Some(tool_name.clone());
            }
            AgentStreamEvent::ToolCompleted { tool_name, content } => {
                if self.running.as_deref() != Some(tool_name.as_str()) {
                    return Err(ProtocolViolation::UnmatchedCompletion {
                        tool_name: tool_name.clone(),
                    });
                }
                self.running = None;
                self.tool_results.push((tool_name.clone(), content.clone()));
            }
            AgentStreamEvent::ContentDelta { content } => self.text.push_str(content),
            AgentStreamEvent::Completed { content } => {
                if *content != self.text {
                    return Err(ProtocolViolation::ContentMismatch);
                }
                self.terminal = Some(StreamOutcome::Completed(content.clone()));
            }
            AgentStreamEvent::Error { content } => {
                self.terminal = Some(StreamOutcome::Failed(content.clone()));
            }
        }

        Ok(())
    }

    /// Text streamed so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of `Thinking` events seen.
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// `(tool_name, content)` for every completed tool, in order.
    pub fn tool_results(&self) -> &[(String, String)] {
        &self.tool_results
    }

    pub fn is_finished(&self) -> bool {
        self.terminal.is_some()
    }

    /// The outcome, once the sender side has closed.
    pub fn finish(self) -> Result<StreamOutcome, ProtocolViolation> {
        self.terminal.ok_or(ProtocolViolation::MissingTerminal)
    }
}

/// Drain `rx` through a [`StreamCollector`].
pub async fn collect(
    mut rx: mpsc::Receiver<AgentStreamEvent>,
) -> Result<(StreamOutcome, StreamCollector), ProtocolViolation> {
    let mut collector = StreamCollector::new();
    while let Some(event) = rx.recv().await {
        collector.observe(&event)?;
    }
    let outcome = collector.terminal.clone().ok_or(ProtocolViolation::MissingTerminal)?;
    Ok((outcome, collector))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(events: &[AgentStreamEvent]) -> Result<StreamCollector, ProtocolViolation> {
        let mut collector = StreamCollector::new();
        for event in events {
            collector.observe(event)?;
        }
        Ok(collector)
    }

    fn delta(s: &str) -> AgentStreamEvent {
        AgentStreamEvent::ContentDelta { content: s.into() }
    }

    fn executing(name: &str) -> AgentStreamEvent {
        AgentStreamEvent::ToolExecuting {
            tool_name: name.into(),
        }
    }

    fn completed_tool(name: &str, content: &str) -> AgentStreamEvent {
        AgentStreamEvent::ToolCompleted {
            tool_name: name.into(),
            content: content.into(),
        }
    }

    #[test]
    fn well_formed_stream() {
        let collector = feed(&[
            AgentStreamEvent::Thinking,
            executing("echo"),
            completed_tool("echo", "hi"),
            AgentStreamEvent::Thinking,
            delta("Hel"),
            delta("lo"),
            AgentStreamEvent::Completed {
                content: "Hello".into(),
            },
        ])
        .unwrap();

        assert_eq!(collector.turns(), 2);
        assert_eq!(collector.tool_results(), &[("echo".to_string(), "hi".to_string())]);
        assert_eq!(
            collector.finish(),
            Ok(StreamOutcome::Completed("Hello".into()))
        );
    }

    #[test]
    fn completed_must_match_deltas() {
        let err = feed(&[
            delta("Hel"),
            AgentStreamEvent::Completed {
                content: "Help".into(),
            },
        ])
        .unwrap_err();
        assert_eq!(err, ProtocolViolation::ContentMismatch);
    }

    #[test]
    fn nothing_after_terminal() {
        let err = feed(&[AgentStreamEvent::error("boom"), AgentStreamEvent::Thinking]).unwrap_err();
        assert_eq!(err, ProtocolViolation::AfterTerminal { event: "thinking" });
    }

    #[test]
    fn tools_do_not_overlap() {
        let err = feed(&[executing("a"), executing("b")]).unwrap_err();
        assert!(matches!(err, ProtocolViolation::OverlappingTool { .. }));

        let err = feed(&[completed_tool("a", "x")]).unwrap_err();
        assert!(matches!(err, ProtocolViolation::UnmatchedCompletion { .. }));
    }

    #[test]
    fn missing_terminal_is_reported() {
        let collector = feed(&[AgentStreamEvent::Thinking, delta("x")]).unwrap();
        assert!(!collector.is_finished());
        assert_eq!(collector.finish(), Err(ProtocolViolation::MissingTerminal));
    }

    #[tokio::test]
    async fn collect_drains_channel() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(AgentStreamEvent::Thinking).await.unwrap();
        tx.send(AgentStreamEvent::error("nope")).await.unwrap();
        drop(tx);

        let (outcome, collector) = collect(rx).await.unwrap();
        assert_eq!(outcome, StreamOutcome::Failed("nope".into()));
        assert_eq!(collector.turns(), 1);
    }
}
