//! JSON content-type checking, parsing, and serialization steps.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::error::StepError;
use crate::step::context::StepContext;
use crate::step::handler::{Step, StepResult};

/// Parses a raw body into a value.
pub type LoadsFn = Arc<dyn Fn(&Bytes) -> Result<Value, StepError> + Send + Sync>;

/// Serializes a value into a response body.
pub type DumpsFn = Arc<dyn Fn(&Value) -> Result<Bytes, StepError> + Send + Sync>;

/// Default parser: strict JSON.
pub fn json_loads() -> LoadsFn {
    Arc::new(|body: &Bytes| serde_json::from_slice(body).map_err(StepError::Deserialize))
}

/// Default serializer: compact JSON.
pub fn json_dumps() -> DumpsFn {
    Arc::new(|value: &Value| {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(StepError::Serialize)
    })
}

fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or("").trim()
}

/// Rejects body-carrying requests whose content type is not JSON.
///
/// Requests without a body pass regardless of the header.
pub struct CheckContentTypeJson;

#[async_trait]
impl Step for CheckContentTypeJson {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        if !context.request_info.expects_body() {
            return Ok(false);
        }
        let content_type = context.request_info.content_type.as_deref().unwrap_or("");
        if essence(content_type) != "application/json" {
            return Err(StepError::Invalid(format!(
                "unsupported content type `{content_type}`"
            )));
        }
        Ok(false)
    }
}

/// Parses the request body into `input_raw` for body-carrying methods.
pub struct DeserializeJson {
    loads: LoadsFn,
}

impl DeserializeJson {
    pub fn new(loads: LoadsFn) -> Self {
        Self { loads }
    }
}

impl Default for DeserializeJson {
    fn default() -> Self {
        Self::new(json_loads())
    }
}

#[async_trait]
impl Step for DeserializeJson {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        if !context.request_info.expects_body() {
            return Ok(false);
        }
        context.input_raw = Some((self.loads)(&context.request_body)?);
        Ok(false)
    }
}

/// Serializes `output_raw` into the response body.
///
/// No output means an empty body, which the response stage turns into 204.
pub struct SerializeJson {
    dumps: DumpsFn,
}

impl SerializeJson {
    pub fn new(dumps: DumpsFn) -> Self {
        Self { dumps }
    }
}

impl Default for SerializeJson {
    fn default() -> Self {
        Self::new(json_dumps())
    }
}

#[async_trait]
impl Step for SerializeJson {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        context.response_body = match &context.output_raw {
            Some(value) => (self.dumps)(value)?,
            None => Bytes::new(),
        };
        Ok(false)
    }
}
