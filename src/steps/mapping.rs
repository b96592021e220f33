//! Mapping steps bridging raw and business representations.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StepError;
use crate::mapping::MapperFn;
use crate::step::context::StepContext;
use crate::step::handler::{Step, StepResult};

fn apply(mapper: &MapperFn, value: &Value, expect_list: bool) -> Result<Value, StepError> {
    if !expect_list {
        return Ok(mapper(value));
    }
    match value {
        Value::Array(items) => Ok(Value::Array(items.iter().map(|item| mapper(item)).collect())),
        _ => Err(StepError::Invalid(
            "expected a list of objects".to_string(),
        )),
    }
}

/// Maps `input_raw` to `input_business`.
///
/// Without input the stage is a no-op, so the same definition serves
/// body-carrying and bodyless methods.
pub struct MapInput {
    mapper: MapperFn,
    expect_list: bool,
}

impl MapInput {
    pub fn new(mapper: MapperFn, expect_list: bool) -> Self {
        Self {
            mapper,
            expect_list,
        }
    }
}

#[async_trait]
impl Step for MapInput {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        if let Some(input) = &context.input_raw {
            context.input_business = Some(apply(&self.mapper, input, self.expect_list)?);
        }
        Ok(false)
    }
}

/// Maps `output_business` to `output_raw`.
pub struct MapOutput {
    mapper: MapperFn,
    expect_list: bool,
}

impl MapOutput {
    pub fn new(mapper: MapperFn, expect_list: bool) -> Self {
        Self {
            mapper,
            expect_list,
        }
    }
}

#[async_trait]
impl Step for MapOutput {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        if let Some(output) = &context.output_business {
            context.output_raw = Some(apply(&self.mapper, output, self.expect_list)?);
        }
        Ok(false)
    }
}
