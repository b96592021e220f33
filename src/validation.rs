//! JSON Schema validation with a shared, refreshable schema store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use jsonschema::{Draft, JSONSchema, SchemaResolver, SchemaResolverError};
use serde_json::{json, Value};
use url::Url;

use crate::error::ConfigError;
use crate::registry::{processor_key, ProcessorRegistry};

/// Validates a value; `None` means valid, otherwise the error messages.
pub type ValidatorFn = Arc<dyn Fn(&Value) -> Option<Vec<String>> + Send + Sync>;

/// Registry of validators keyed by `(type_id, action_id)`.
pub type ValidatorRegistry = ProcessorRegistry<ValidatorFn>;

/// Shared store of schema documents keyed by `$id`.
///
/// Clones share the underlying map, so documents added after a validator
/// was compiled become visible on the next [`Validation::refresh`].
#[derive(Clone, Default)]
pub struct SchemaStore {
    schemas: Arc<RwLock<HashMap<String, Arc<Value>>>>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schema document under its `$id`, replacing any previous one.
    pub fn add(&self, schema: Value) -> Result<String, ConfigError> {
        let id = schema
            .get("$id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ConfigError::MissingSchemaId)?;
        self.schemas
            .write()
            .unwrap()
            .insert(id.clone(), Arc::new(schema));
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.schemas.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.read().unwrap().is_empty()
    }
}

impl SchemaResolver for SchemaStore {
    fn resolve(
        &self,
        _root_schema: &Value,
        url: &Url,
        _original_reference: &str,
    ) -> Result<Arc<Value>, SchemaResolverError> {
        let mut key = url.clone();
        key.set_fragment(None);
        self.schemas
            .read()
            .unwrap()
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("unknown schema `{key}`"))
    }
}

struct CompiledSchema {
    reference: String,
    schema: Arc<JSONSchema>,
}

/// Compiles `$ref` validators against a [`SchemaStore`] and registers them.
///
/// Compiled schemas live in a cache consulted at call time, so
/// [`Validation::refresh`] swaps in recompiled schemas without touching the
/// registry the pipelines already hold.
pub struct Validation {
    store: SchemaStore,
    compiled: Arc<RwLock<HashMap<String, CompiledSchema>>>,
    registry: ValidatorRegistry,
}

impl Validation {
    pub fn new(store: SchemaStore) -> Self {
        Self {
            store,
            compiled: Arc::new(RwLock::new(HashMap::new())),
            registry: ValidatorRegistry::new("validator"),
        }
    }

    pub fn store(&self) -> &SchemaStore {
        &self.store
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    fn compile(&self, reference: &str) -> Result<Arc<JSONSchema>, ConfigError> {
        let schema = json!({ "$ref": reference });
        JSONSchema::options()
            .with_draft(Draft::Draft202012)
            .with_resolver(self.store.clone())
            .compile(&schema)
            .map(Arc::new)
            .map_err(|err| ConfigError::SchemaCompile {
                reference: reference.to_string(),
                message: err.to_string(),
            })
    }

    /// Compile `reference` and register a validator for `(type_id, action_id)`.
    ///
    /// Re-registering an already-cached pair is a no-op, so endpoint
    /// definitions can be loaded repeatedly; [`Validation::refresh`] is the
    /// path for picking up evolved schemas.
    pub fn register_jsonschema(
        &mut self,
        type_id: &str,
        action_id: Option<&str>,
        reference: &str,
    ) -> Result<(), ConfigError> {
        if type_id.is_empty() {
            return Err(ConfigError::EmptyTypeId);
        }
        if action_id == Some("") {
            return Err(ConfigError::EmptyActionId);
        }

        let key = processor_key(type_id, action_id);
        if self.compiled.read().unwrap().contains_key(&key) {
            tracing::debug!(key = %key, "validator already registered");
            return Ok(());
        }

        let schema = self.compile(reference)?;
        self.compiled.write().unwrap().insert(
            key.clone(),
            CompiledSchema {
                reference: reference.to_string(),
                schema,
            },
        );

        let compiled = Arc::clone(&self.compiled);
        let validator: ValidatorFn = Arc::new(move |value: &Value| {
            let schema = {
                let cache = compiled.read().unwrap();
                Arc::clone(&cache.get(&key)?.schema)
            };
            let messages: Option<Vec<String>> = match schema.validate(value) {
                Ok(()) => None,
                Err(errors) => Some(
                    errors
                        .map(|error| format!("{}: {error}", error.instance_path))
                        .collect(),
                ),
            };
            messages
        });
        self.registry.register(type_id, action_id, validator)
    }

    /// Recompile every cached schema against the current store contents.
    pub fn refresh(&self) -> Result<(), ConfigError> {
        let references: Vec<(String, String)> = {
            let cache = self.compiled.read().unwrap();
            cache
                .iter()
                .map(|(key, entry)| (key.clone(), entry.reference.clone()))
                .collect()
        };
        for (key, reference) in references {
            let schema = self.compile(&reference)?;
            self.compiled.write().unwrap().insert(
                key,
                CompiledSchema {
                    reference,
                    schema,
                },
            );
        }
        Ok(())
    }
}
