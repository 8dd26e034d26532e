//! Error types for the ClawPipe domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] is the one that
//! travels through the middleware chain.

use std::time::Duration;
use thiserror::Error;

/// The top-level error type for pipeline operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Skill registry errors ---
    #[error("Skill registry error: {0}")]
    Registry(#[from] RegistryError),

    // --- Execution control ---
    /// The pipeline deadline elapsed while the caller was still waiting.
    #[error("Agent request timed out after {0:?}")]
    Timeout(Duration),

    /// A cancellation signal fired before the operation finished.
    #[error("Operation was cancelled")]
    Cancelled,

    /// The consumer of an event stream went away.
    #[error("Event stream consumer disconnected")]
    StreamClosed,

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Skill '{0}' is already registered")]
    DuplicateSkill(String),
}

/// Violations of the tool-call correlation rules of a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("Tool message at position {position} has no tool_call_id")]
    MissingToolCallId { position: usize },

    #[error("Tool result '{call_id}' does not answer any earlier tool call")]
    OrphanToolResult { call_id: String },

    #[error("Tool call '{call_id}' was answered more than once")]
    DuplicateToolResult { call_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn timeout_and_cancellation_are_distinct() {
        let timeout = Error::Timeout(Duration::from_secs(120));
        assert!(timeout.to_string().contains("timed out"));
        assert!(timeout.to_string().contains("120s"));
        assert_eq!(Error::Cancelled.to_string(), "Operation was cancelled");
    }

    #[test]
    fn registry_error_names_the_skill() {
        let err = Error::from(RegistryError::DuplicateSkill("echo".into()));
        assert!(err.to_string().contains("'echo'"));
    }
}
