//! Security module for ClawPipe: secret detection and redaction.
//!
//! Provides:
//! - **Redaction**: mask credentials (vendor API keys, bearer tokens, private
//!   key blocks, `key=value` secrets, long base64 blobs) in text before it
//!   leaves the pipeline or reaches a log sink

pub mod redact;

pub use redact::{REDACTED, contains_secret, redact_secrets};
