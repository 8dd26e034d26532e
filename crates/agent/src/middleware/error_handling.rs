//! Outermost layer: turns every inner failure into user-safe text.

use async_trait::async_trait;
use clawpipe_core::{AgentContext, Error, Result};
use clawpipe_security::redact_secrets;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use super::{Middleware, Next};

/// Reported when the caller's own token fired.
pub const CANCELLED_MESSAGE: &str = "Operation was cancelled";

/// Map a failure to the text shown to the user.
///
/// `caller` must be the token the caller passed in, not a derived one: a
/// fired caller token always reads as cancellation, even when an inner
/// deadline fired at the same moment.
pub fn describe_failure(err: &Error, caller: &CancellationToken) -> String {
    if caller.is_cancelled() || matches!(err, Error::Cancelled) {
        warn!("Agent operation cancelled");
        return CANCELLED_MESSAGE.to_string();
    }

    let message = redact_secrets(&err.to_string()).into_owned();
    match err {
        Error::Timeout(after) => warn!(?after, "Agent request timed out"),
        _ => error!(error = %message, "Unhandled agent failure"),
    }
    format!("An error occurred: {message}")
}

/// Catches cancellation, timeouts and provider failures from everything
/// inside it, so the buffered entry point never surfaces an ordinary
/// failure as `Err`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorHandlingMiddleware;

#[async_trait]
impl Middleware for ErrorHandlingMiddleware {
    fn name(&self) -> &str {
        "error_handling"
    }

    async fn invoke(
        &self,
        ctx: &mut AgentContext,
        next: Next<'_>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        match next.run(ctx, cancel).await {
            Ok(output) => Ok(output),
            Err(err) => self.recover(err, cancel),
        }
    }

    fn recover(&self, err: Error, cancel: &CancellationToken) -> Result<String> {
        Ok(describe_failure(&err, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawpipe_core::ProviderError;
    use std::time::Duration;

    #[test]
    fn caller_cancellation_wins_over_timeout() {
        let caller = CancellationToken::new();
        caller.cancel();
        let text = describe_failure(&Error::Timeout(Duration::from_secs(1)), &caller);
        assert_eq!(text, CANCELLED_MESSAGE);
    }

    #[test]
    fn timeout_is_reported_distinctly() {
        let text = describe_failure(
            &Error::Timeout(Duration::from_secs(120)),
            &CancellationToken::new(),
        );
        assert!(text.starts_with("An error occurred: "));
        assert!(text.contains("timed out"));
        assert_ne!(text, CANCELLED_MESSAGE);
    }

    #[test]
    fn provider_failure_is_generic_and_redacted() {
        let err = Error::Provider(ProviderError::AuthenticationFailed(
            "bad key sk-ant-REDACTED".into(),
        ));
        let text = describe_failure(&err, &CancellationToken::new());
        assert!(text.starts_with("An error occurred: Provider error: Authentication failed"));
        assert!(text.contains("sk-ant-[REDACTED]"));
        assert!(!text.contains("abcdefghijklmnopqrstuvwxyz"));
    }
}
