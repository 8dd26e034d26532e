//! Masks credentials in the final answer.

use async_trait::async_trait;
use clawpipe_core::{AgentContext, Result};
use clawpipe_security::{contains_secret, redact_secrets};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Middleware, Next};

/// `ctx.items` key set to `true` when the final answer had secrets masked.
pub const SECRETS_REDACTED_KEY: &str = "secrets_redacted";

/// Redacts the text returned by the rest of the chain. Intermediate
/// transcript content is left alone; failures pass through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecretRedactionMiddleware;

#[async_trait]
impl Middleware for SecretRedactionMiddleware {
    fn name(&self) -> &str {
        "secret_redaction"
    }

    async fn invoke(
        &self,
        ctx: &mut AgentContext,
        next: Next<'_>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let output = next.run(ctx, cancel).await?;
        if !contains_secret(&output) {
            return Ok(output);
        }

        debug!("Masking secrets in final answer");
        ctx.items
            .insert(SECRETS_REDACTED_KEY.to_string(), serde_json::Value::Bool(true));
        Ok(redact_secrets(&output).into_owned())
    }
}
