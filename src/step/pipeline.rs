//! The request executor: runs resolved stages in their fixed order.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use bytes::Bytes;
use http::Response;

use crate::error::StepError;
use crate::step::compose::{ResolvedSteps, StepsDefinition};
use crate::step::context::{RequestHandle, StepContext};
use crate::step::handler::{Step, StepHandler};
use crate::step::stage::Stage;

/// A fully resolved endpoint pipeline.
///
/// Construction is the configuration phase; afterwards the pipeline is
/// immutable and shared, and every request gets its own [`StepContext`].
pub struct Pipeline {
    process: Vec<(Stage, StepHandler)>,
    response: Vec<(Stage, StepHandler)>,
    exception_handler: Option<StepHandler>,
    error_status_to_http: Arc<HashMap<i64, u16>>,
}

impl Pipeline {
    /// Build from resolved steps; absent stages are skipped entirely.
    pub fn new(mut steps: ResolvedSteps, error_status_to_http: Arc<HashMap<i64, u16>>) -> Self {
        let collect = |steps: &mut ResolvedSteps, order: &[Stage]| {
            order
                .iter()
                .filter_map(|&stage| steps.take(stage).map(|handler| (stage, handler)))
                .collect()
        };

        let process = collect(&mut steps, &Stage::PROCESS_ORDER);
        let response = collect(&mut steps, &Stage::RESPONSE_ORDER);
        let exception_handler = steps.take(Stage::ExceptionHandler);

        Self {
            process,
            response,
            exception_handler,
            error_status_to_http,
        }
    }

    /// Resolve a definition and build the pipeline in one go.
    pub fn from_definition(
        definition: StepsDefinition,
        error_status_to_http: HashMap<i64, u16>,
    ) -> Self {
        Self::new(definition.resolve(), Arc::new(error_status_to_http))
    }

    /// Serve one request.
    ///
    /// Processing stages run in order until one fails; a failure is offered
    /// to the exception handler, which either claims it (the response phase
    /// then runs as usual) or lets it propagate. Response-stage errors are
    /// never intercepted.
    pub async fn handle(
        &self,
        request: RequestHandle,
        custom_info: HashMap<String, String>,
    ) -> Result<Response<Bytes>, StepError> {
        let mut context = StepContext::new(
            request,
            custom_info,
            Arc::clone(&self.error_status_to_http),
        );

        for (stage, handler) in &self.process {
            context.current_step = Some(*stage);
            tracing::trace!(stage = %stage, "running step");
            if let Err(err) = handler.run(&mut context).await {
                tracing::debug!(stage = %stage, error = %err, "step failed");
                context.exception = Some(err);
                break;
            }
        }

        if context.exception.is_some() {
            let handled = match &self.exception_handler {
                // current_step keeps naming the failing stage so the
                // handler can dispatch on it.
                Some(handler) => handler.run(&mut context).await?,
                None => false,
            };

            if !handled {
                let err = context.exception.take().unwrap_or_else(|| {
                    StepError::Other(anyhow!("step failure consumed by exception handler"))
                });
                tracing::error!(
                    stage = context.current_step.map_or("?", Stage::as_str),
                    error = %err,
                    "unhandled step failure"
                );
                return Err(err);
            }
        }

        for (stage, handler) in &self.response {
            context.current_step = Some(*stage);
            tracing::trace!(stage = %stage, "running response step");
            handler.run(&mut context).await?;
        }

        context
            .response
            .take()
            .ok_or_else(|| StepError::Other(anyhow!("pipeline produced no response")))
    }
}
