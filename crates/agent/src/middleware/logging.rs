//! Request/response logging with timing.

use async_trait::async_trait;
use clawpipe_core::{AgentContext, Result};
use clawpipe_security::redact_secrets;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{Middleware, Next};

/// `ctx.items` key holding the elapsed milliseconds of the inner chain.
pub const ELAPSED_MS_KEY: &str = "elapsed_ms";

/// Logs input, output, elapsed time and failures, then passes the result
/// through unchanged. Logged strings are redacted first.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    async fn invoke(
        &self,
        ctx: &mut AgentContext,
        next: Next<'_>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let start = Instant::now();
        info!(
            provider = ctx.provider.name(),
            input = %redact_secrets(&ctx.user_input),
            "Agent request started"
        );

        let result = next.run(ctx, cancel).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        ctx.items
            .insert(ELAPSED_MS_KEY.to_string(), serde_json::json!(elapsed_ms));

        match &result {
            Ok(output) => info!(
                elapsed_ms,
                output = %redact_secrets(output),
                "Agent request completed"
            ),
            Err(e) => error!(
                elapsed_ms,
                error = %redact_secrets(&e.to_string()),
                "Agent request failed"
            ),
        }

        result
    }
}
