//! Innermost layer: a hard wall-clock deadline around the loop.

use async_trait::async_trait;
use clawpipe_core::{AgentContext, Error, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{Middleware, Next};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs the rest of the chain under a child token that is cancelled when the
/// deadline passes. Expiry yields [`Error::Timeout`]; a fired caller token
/// yields [`Error::Cancelled`] instead.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutMiddleware {
    timeout: Duration,
}

impl TimeoutMiddleware {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for TimeoutMiddleware {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Middleware for TimeoutMiddleware {
    fn name(&self) -> &str {
        "timeout"
    }

    async fn invoke(
        &self,
        ctx: &mut AgentContext,
        next: Next<'_>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let deadline = cancel.child_token();

        let result = tokio::select! {
            result = next.run(ctx, &deadline) => result,
            _ = tokio::time::sleep(self.timeout) => {
                deadline.cancel();
                if cancel.is_cancelled() {
                    Err(Error::Cancelled)
                } else {
                    warn!(timeout = ?self.timeout, "Agent request timed out");
                    Err(Error::Timeout(self.timeout))
                }
            }
        };

        deadline.cancel();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{PendingProvider, ScriptedProvider, context_with};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_is_a_timeout() {
        let mut ctx = context_with(Arc::new(PendingProvider), vec![], 10, "hi");
        let chain: Vec<Arc<dyn Middleware>> =
            vec![Arc::new(TimeoutMiddleware::new(Duration::from_secs(5)))];

        let err = Next::new(&chain)
            .run(&mut ctx, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn caller_cancellation_is_not_a_timeout() {
        let mut ctx = context_with(Arc::new(PendingProvider), vec![], 10, "hi");
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(TimeoutMiddleware::default())];
        let caller = CancellationToken::new();

        let canceller = caller.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let err = Next::new(&chain).run(&mut ctx, &caller).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn fast_loop_finishes_normally() {
        let provider = Arc::new(ScriptedProvider::text("quick"));
        let mut ctx = context_with(provider, vec![], 10, "hi");
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(TimeoutMiddleware::default())];

        let out = Next::new(&chain)
            .run(&mut ctx, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, "quick");
        assert_eq!(TimeoutMiddleware::default().timeout(), DEFAULT_TIMEOUT);
    }
}
