//! Default step set for a JSON endpoint.

use std::sync::Arc;

use crate::mapping::{MapperFn, MapperRegistry};
use crate::step::compose::{StepDeclaration, StepsDefinition};
use crate::step::stage::Stage;
use crate::steps::json::{
    json_dumps, json_loads, CheckContentTypeJson, DeserializeJson, DumpsFn, LoadsFn, SerializeJson,
};
use crate::steps::mapping::{MapInput, MapOutput};
use crate::steps::recover::default_exception_handlers;
use crate::steps::validation::ValidateInput;
use crate::validation::{ValidatorFn, ValidatorRegistry};

/// Knobs for [`default_json_steps`].
pub struct JsonStepParams {
    /// Type the endpoint serves; keys the mapper and validator lookups.
    pub type_id: String,
    /// Action for the input mapper and validator lookup.
    pub action_id_input: Option<String>,
    /// Action for the output mapper lookup.
    pub action_id_output: Option<String>,
    /// Whether the raw input is a list of objects.
    pub expect_input_list: bool,
    /// Whether the business output is a list of objects.
    pub expect_output_list: bool,
    /// Body parser.
    pub loads: LoadsFn,
    /// Body serializer.
    pub dumps: DumpsFn,
}

impl JsonStepParams {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            action_id_input: Some("input".to_string()),
            action_id_output: Some("output".to_string()),
            expect_input_list: false,
            expect_output_list: false,
            loads: json_loads(),
            dumps: json_dumps(),
        }
    }
}

/// Actioned lookup with fallback to the bare type key.
fn lookup<P: Clone>(
    registry: &crate::registry::ProcessorRegistry<P>,
    type_id: &str,
    action_id: Option<&str>,
) -> Option<P> {
    registry
        .get(type_id, action_id)
        .or_else(|| registry.get(type_id, None))
        .cloned()
}

/// Build the default stage set for a JSON endpoint.
///
/// Stages whose processor is not registered are simply absent: an endpoint
/// without an input mapper passes `input_raw` through untouched, and one
/// without a validator skips validation entirely.
pub fn default_json_steps(
    params: JsonStepParams,
    mappers: &MapperRegistry,
    validators: &ValidatorRegistry,
) -> StepsDefinition {
    let mut definition = StepsDefinition::new()
        .default_for(
            Stage::CheckHeaders,
            StepDeclaration::single(CheckContentTypeJson),
        )
        .default_for(
            Stage::Deserialize,
            StepDeclaration::single(DeserializeJson::new(Arc::clone(&params.loads))),
        )
        .default_for(
            Stage::Serialize,
            StepDeclaration::single(SerializeJson::new(Arc::clone(&params.dumps))),
        )
        .default_for(Stage::ExceptionHandler, default_exception_handlers());

    let validator: Option<ValidatorFn> = lookup(
        validators,
        &params.type_id,
        params.action_id_input.as_deref(),
    );
    if let Some(validator) = validator {
        definition = definition.default_for(
            Stage::ValidateInput,
            StepDeclaration::single(ValidateInput::new(validator)),
        );
    }

    let input_mapper: Option<MapperFn> = lookup(
        mappers,
        &params.type_id,
        params.action_id_input.as_deref(),
    );
    if let Some(mapper) = input_mapper {
        definition = definition.default_for(
            Stage::MapInput,
            StepDeclaration::single(MapInput::new(mapper, params.expect_input_list)),
        );
    }

    let output_mapper: Option<MapperFn> = lookup(
        mappers,
        &params.type_id,
        params.action_id_output.as_deref(),
    );
    if let Some(mapper) = output_mapper {
        definition = definition.default_for(
            Stage::MapOutput,
            StepDeclaration::single(MapOutput::new(mapper, params.expect_output_list)),
        );
    }

    definition
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::mapping::SimpleMapping;

    fn registries() -> (MapperRegistry, ValidatorRegistry) {
        let mut mappers = MapperRegistry::new("mapper");
        SimpleMapping::new("ticket")
            .action("input")
            .fields(["id", "title"])
            .register(&mut mappers)
            .unwrap();
        SimpleMapping::new("ticket")
            .action("output")
            .fields(["id", "title", "state"])
            .register(&mut mappers)
            .unwrap();

        let mut validators = ValidatorRegistry::new("validator");
        let always_ok: ValidatorFn = Arc::new(|_: &Value| None);
        validators
            .register("ticket", Some("input"), always_ok)
            .unwrap();

        (mappers, validators)
    }

    #[test]
    fn test_full_default_set() {
        let (mappers, validators) = registries();
        let resolved =
            default_json_steps(JsonStepParams::new("ticket"), &mappers, &validators).resolve();

        for stage in [
            Stage::CheckHeaders,
            Stage::Deserialize,
            Stage::ValidateInput,
            Stage::MapInput,
            Stage::MapOutput,
            Stage::Serialize,
            Stage::ExceptionHandler,
        ] {
            assert!(resolved.get(stage).is_some(), "missing {stage}");
        }
    }

    #[test]
    fn test_unregistered_processors_leave_stages_absent() {
        let mappers = MapperRegistry::new("mapper");
        let validators = ValidatorRegistry::new("validator");
        let resolved =
            default_json_steps(JsonStepParams::new("ticket"), &mappers, &validators).resolve();

        assert!(resolved.get(Stage::ValidateInput).is_none());
        assert!(resolved.get(Stage::MapInput).is_none());
        assert!(resolved.get(Stage::MapOutput).is_none());
        assert!(resolved.get(Stage::Deserialize).is_some());
        assert!(resolved.get(Stage::Serialize).is_some());
    }

    #[test]
    fn test_bare_type_key_serves_as_fallback() {
        let mut mappers = MapperRegistry::new("mapper");
        SimpleMapping::new("ticket")
            .fields(["id"])
            .register(&mut mappers)
            .unwrap();
        let validators = ValidatorRegistry::new("validator");

        let resolved =
            default_json_steps(JsonStepParams::new("ticket"), &mappers, &validators).resolve();
        assert!(resolved.get(Stage::MapInput).is_some());
        assert!(resolved.get(Stage::MapOutput).is_some());
    }

    #[tokio::test]
    async fn test_defaults_yield_to_base_overrides() {
        use crate::step::context::{RequestHandle, StepContext};
        use crate::step::handler::Step;
        use bytes::Bytes;
        use http::{HeaderMap, Method};
        use std::collections::HashMap;

        let (mappers, validators) = registries();
        let resolved = default_json_steps(JsonStepParams::new("ticket"), &mappers, &validators)
            .base(
                Stage::MapInput,
                StepDeclaration::Single(crate::step::handler::step_fn(|ctx: &mut StepContext| {
                    Box::pin(async move {
                        ctx.input_business = Some(json!({"override": true}));
                        Ok(false)
                    })
                })),
            )
            .resolve();

        let mut ctx = StepContext::new(
            RequestHandle::new(Method::POST, HeaderMap::new(), Bytes::new()),
            HashMap::new(),
            Arc::new(HashMap::new()),
        );
        ctx.input_raw = Some(json!({"id": 7}));
        resolved
            .get(Stage::MapInput)
            .unwrap()
            .run(&mut ctx)
            .await
            .unwrap();
        assert_eq!(ctx.input_business, Some(json!({"override": true})));
    }
}
