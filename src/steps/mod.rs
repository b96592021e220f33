//! Reusable stage handlers and the default JSON endpoint step set.

pub mod defaults;
pub mod json;
pub mod mapping;
pub mod recover;
pub mod validation;

pub use defaults::{default_json_steps, JsonStepParams};
pub use json::{
    json_dumps, json_loads, CheckContentTypeJson, DeserializeJson, DumpsFn, LoadsFn, SerializeJson,
};
pub use mapping::{MapInput, MapOutput};
pub use recover::{
    default_error_status_to_http, default_exception_handlers, DeserializeRecovery,
    NotFoundRecovery, ValidationRecovery, STATUS_DESERIALIZE, STATUS_INTERNAL, STATUS_NOT_FOUND,
    STATUS_SERIALIZE, STATUS_VALIDATION,
};
pub use validation::ValidateInput;
