//! Stock recovery steps turning expected failures into error responses.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::error::StepError;
use crate::step::compose::StepDeclaration;
use crate::step::context::StepContext;
use crate::step::handler::{Step, StepHandler, StepResult};
use crate::step::stage::Stage;

/// Request body could not be parsed.
pub const STATUS_DESERIALIZE: i64 = 1;
/// Response could not be serialized.
pub const STATUS_SERIALIZE: i64 = 2;
/// Input failed validation.
pub const STATUS_VALIDATION: i64 = 3;
/// Referenced object does not exist.
pub const STATUS_NOT_FOUND: i64 = 10;
/// Unexpected internal failure.
pub const STATUS_INTERNAL: i64 = 999;

/// Default application-status to HTTP-status table.
pub fn default_error_status_to_http() -> HashMap<i64, u16> {
    HashMap::from([
        (STATUS_DESERIALIZE, 400),
        (STATUS_SERIALIZE, 500),
        (STATUS_VALIDATION, 400),
        (STATUS_NOT_FOUND, 404),
        (STATUS_INTERNAL, 500),
    ])
}

/// Claims parse failures from the deserialize stage.
pub struct DeserializeRecovery;

#[async_trait]
impl Step for DeserializeRecovery {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        if !matches!(context.exception, Some(StepError::Deserialize(_))) {
            return Ok(false);
        }
        context.error_status = STATUS_DESERIALIZE;
        context.output_raw = Some(json!({"error": STATUS_DESERIALIZE}));
        Ok(true)
    }
}

/// Claims validation failures, echoing the messages in the error body.
pub struct ValidationRecovery;

#[async_trait]
impl Step for ValidationRecovery {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        let Some(StepError::Validation(messages)) = &context.exception else {
            return Ok(false);
        };
        context.error_status = STATUS_VALIDATION;
        context.output_raw = Some(json!({
            "error": STATUS_VALIDATION,
            "messages": messages,
        }));
        Ok(true)
    }
}

/// Claims not-found failures from the business stage.
pub struct NotFoundRecovery;

#[async_trait]
impl Step for NotFoundRecovery {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        if !matches!(context.exception, Some(StepError::NotFound(_))) {
            return Ok(false);
        }
        context.error_status = STATUS_NOT_FOUND;
        context.output_raw = Some(json!({"error": STATUS_NOT_FOUND}));
        Ok(true)
    }
}

/// Stage-keyed default exception handler.
///
/// Failures from other stages, or of unexpected kinds at these stages,
/// fall through and propagate to the transport layer.
pub fn default_exception_handlers() -> StepDeclaration {
    let map: HashMap<Stage, StepHandler> = HashMap::from([
        (
            Stage::Deserialize,
            Arc::new(DeserializeRecovery) as StepHandler,
        ),
        (
            Stage::ValidateInput,
            Arc::new(ValidationRecovery) as StepHandler,
        ),
        (Stage::Business, Arc::new(NotFoundRecovery) as StepHandler),
    ]);
    StepDeclaration::Keyed(map)
}
