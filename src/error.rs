//! Error types for pipeline construction and execution.

use thiserror::Error;

/// Application-level failure raised by a pipeline stage.
///
/// Every processing-stage error is captured by the executor and offered to
/// the pipeline's exception handler, which claims it by category or lets it
/// propagate to the transport layer.
#[derive(Debug, Error)]
pub enum StepError {
    /// Request body could not be parsed.
    #[error("request body is not valid JSON: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// Response value could not be serialized.
    #[error("response body could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Schema or semantic validation of the parsed input failed.
    #[error("input validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A referenced entity does not exist (business error).
    #[error("object not found: {0}")]
    NotFound(String),

    /// The request is malformed in a way a stage check rejected.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// Anything else a stage handler ran into.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Pipeline wiring mistake detected at construction or registration time.
///
/// These are fatal configuration errors: they fire during start-up, before
/// any request is served.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A step declaration names a stage the pipeline does not know.
    #[error("unknown stage `{0}`")]
    UnknownStage(String),

    /// Two processors were registered under the same `(type_id, action_id)`.
    #[error("{registry} registry already contains `{key}`")]
    DuplicateProcessor {
        registry: &'static str,
        key: String,
    },

    /// `type_id` must be a non-empty string.
    #[error("type_id must be a non-empty string")]
    EmptyTypeId,

    /// `action_id`, when given, must be a non-empty string.
    #[error("action_id must be a non-empty string when given")]
    EmptyActionId,

    /// A simple mapping was declared without any fields or custom mapping.
    #[error("no field mapping defined for `{0}`")]
    EmptyMapping(String),

    /// Converters were declared for fields absent from the mapping.
    #[error("converters declared for unmapped fields: {0:?}")]
    UnknownConverters(Vec<String>),

    /// A schema document carries no `$id` to register it under.
    #[error("schema document has no `$id`")]
    MissingSchemaId,

    /// A `$ref` could not be compiled against the schema store.
    #[error("schema `{reference}` could not be compiled: {message}")]
    SchemaCompile {
        reference: String,
        message: String,
    },
}
