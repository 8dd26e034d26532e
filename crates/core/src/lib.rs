//! # ClawPipe Core
//!
//! Domain types, traits, and error definitions for the ClawPipe agent
//! pipeline. This crate holds no orchestration logic; it defines the
//! contracts that the agent loop, the middleware chain and the external
//! collaborators (LLM backends, skill implementations) meet at.
//!
//! ## Design Philosophy
//!
//! Every collaborator is a trait here:
//! - [`Provider`] / [`ProviderFactory`]: the LLM backend, resolved once per execution
//! - [`Skill`]: a callable tool with a declarative parameter schema
//!
//! Implementations live outside this crate, which keeps the dependency graph
//! pointing inward and makes scripted test doubles trivial to write.

pub mod context;
pub mod error;
pub mod message;
pub mod provider;
pub mod registry;
pub mod settings;
pub mod skill;

// Re-export key types at crate root for ergonomics
pub use context::{AgentContext, AgentOptions};
pub use error::{Error, ProviderError, RegistryError, Result, TranscriptError};
pub use message::{Message, Role, ToolCall, validate_transcript};
pub use provider::{
    ChatResponse, ChunkReceiver, FixedProviderFactory, Provider, ProviderFactory, StreamChunk,
    ToolCallAccumulator, ToolCallDelta, ToolDefinition,
};
pub use registry::SkillRegistry;
pub use settings::SkillSettings;
pub use skill::{ParameterType, Skill, SkillParameter, SkillResult, parse_arguments};

/// Cancellation signal threaded through every suspension point.
pub use tokio_util::sync::CancellationToken;
