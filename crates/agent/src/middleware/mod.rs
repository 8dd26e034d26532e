//! Middleware chain around the reasoning loop.
//!
//! A chain is an ordered slice of [`Middleware`]s. Each link receives a
//! [`Next`] bound to the rest of the slice; the end of the slice is the
//! buffered reasoning loop. The first-registered middleware therefore runs
//! first on the way in and last on the way out.
//!
//! Canonical order (see `PipelineBuilder::with_standard_middleware`):
//!
//! ```text
//! ErrorHandling → SecretRedaction → Logging → Timeout → loop
//! ```

mod error_handling;
mod logging;
mod redaction;
mod timeout;

pub use error_handling::{CANCELLED_MESSAGE, ErrorHandlingMiddleware, describe_failure};
pub use logging::{ELAPSED_MS_KEY, LoggingMiddleware};
pub use redaction::{SECRETS_REDACTED_KEY, SecretRedactionMiddleware};
pub use timeout::{DEFAULT_TIMEOUT, TimeoutMiddleware};

use async_trait::async_trait;
use clawpipe_core::{AgentContext, Error, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::loop_runner;

/// A cross-cutting interceptor around the reasoning loop.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Do work around `next`. Call `next.run(ctx, token)` exactly once to
    /// continue the chain, or not at all to short-circuit it.
    async fn invoke(
        &self,
        ctx: &mut AgentContext,
        next: Next<'_>,
        cancel: &CancellationToken,
    ) -> Result<String>;

    /// Handle a failure that happened before the chain could start, such
    /// as provider resolution. Layers that turn failures into output
    /// override this; the rest pass the error outward.
    fn recover(&self, err: Error, _cancel: &CancellationToken) -> Result<String> {
        Err(err)
    }
}

/// Offer a setup failure to every layer, innermost first, as if it had been
/// raised at the bottom of the chain.
pub fn recover(
    chain: &[Arc<dyn Middleware>],
    err: Error,
    cancel: &CancellationToken,
) -> Result<String> {
    let mut err = err;
    for middleware in chain.iter().rev() {
        match middleware.recover(err, cancel) {
            Ok(output) => return Ok(output),
            Err(next) => err = next,
        }
    }
    Err(err)
}

/// The remainder of a middleware chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub fn new(chain: &'a [Arc<dyn Middleware>]) -> Self {
        Self { chain }
    }

    /// Run the next link, or the reasoning loop when the chain is spent.
    pub async fn run(self, ctx: &mut AgentContext, cancel: &CancellationToken) -> Result<String> {
        match self.chain.split_first() {
            Some((head, rest)) => head.invoke(ctx, Next { chain: rest }, cancel).await,
            None => loop_runner::run(ctx, cancel).await,
        }
    }

    /// Number of middlewares still ahead.
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }
}
