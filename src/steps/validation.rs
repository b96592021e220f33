//! Input validation step.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StepError;
use crate::step::context::StepContext;
use crate::step::handler::{Step, StepResult};
use crate::validation::ValidatorFn;

/// Validates `input_raw` with a registered validator.
///
/// An absent input is validated as `null`, so schemas requiring a body
/// reject bodyless requests instead of silently passing them.
pub struct ValidateInput {
    validator: ValidatorFn,
}

impl ValidateInput {
    pub fn new(validator: ValidatorFn) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Step for ValidateInput {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        let input = context.input_raw.as_ref().unwrap_or(&Value::Null);
        if let Some(errors) = (self.validator)(input) {
            return Err(StepError::Validation(errors));
        }
        Ok(false)
    }
}
