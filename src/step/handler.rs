//! The stage handler contract.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::error::StepError;
use crate::step::context::StepContext;

/// Outcome of one stage handler invocation.
///
/// `Ok(true)` means "handled": meaningful for list members (ORed together)
/// and for exception handlers (claims the failure); plain stages return
/// `Ok(false)`. `Err` aborts the processing phase.
pub type StepResult = Result<bool, StepError>;

/// A unit of work in the pipeline.
///
/// Handlers may suspend on I/O but must complete, successfully or not,
/// before the pipeline advances; no two stages of one request ever run
/// concurrently.
#[async_trait]
pub trait Step: Send + Sync {
    async fn run(&self, context: &mut StepContext) -> StepResult;
}

/// Shared, cheaply clonable stage handler.
pub type StepHandler = Arc<dyn Step>;

/// Adapter turning a boxed-future closure into a [`Step`].
///
/// Handy for one-off handlers; anything reused is better off as a named
/// struct implementing [`Step`] directly.
pub struct StepFn<F>(pub F);

#[async_trait]
impl<F> Step for StepFn<F>
where
    F: for<'a> Fn(&'a mut StepContext) -> BoxFuture<'a, StepResult> + Send + Sync,
{
    async fn run(&self, context: &mut StepContext) -> StepResult {
        (self.0)(context).await
    }
}

/// Wrap a boxed-future closure as a shared handler.
pub fn step_fn<F>(f: F) -> StepHandler
where
    F: for<'a> Fn(&'a mut StepContext) -> BoxFuture<'a, StepResult> + Send + Sync + 'static,
{
    Arc::new(StepFn(f))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bytes::Bytes;
    use http::{HeaderMap, Method};

    use super::*;
    use crate::step::context::RequestHandle;

    fn test_context() -> StepContext {
        StepContext::new(
            RequestHandle::new(Method::GET, HeaderMap::new(), Bytes::new()),
            HashMap::new(),
            Arc::new(HashMap::new()),
        )
    }

    #[tokio::test]
    async fn test_step_fn_runs_closure() {
        let handler = step_fn(|ctx: &mut StepContext| {
            Box::pin(async move {
                ctx.error_status = 7;
                Ok(true)
            })
        });

        let mut ctx = test_context();
        let handled = handler.run(&mut ctx).await.unwrap();
        assert!(handled);
        assert_eq!(ctx.error_status, 7);
    }
}
