//! Declarative field mappers between raw and business representations.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::registry::ProcessorRegistry;

/// A pure value-to-value mapper.
pub type MapperFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Converts one extracted field value.
pub type FieldConverter = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Extracts a named entry from a source value; `Null` when absent.
pub type GetFieldFn = Arc<dyn Fn(&Value, &str) -> Value + Send + Sync>;

/// Registry of mappers keyed by `(type_id, action_id)`.
pub type MapperRegistry = ProcessorRegistry<MapperFn>;

/// Default accessor: plain object-key lookup.
pub fn get_field_entry(source: &Value, name: &str) -> Value {
    source.get(name).cloned().unwrap_or(Value::Null)
}

/// Follow a dot-separated path through nested objects.
fn get_path(source: &Value, path: &str, accessor: &GetFieldFn) -> Value {
    let mut segments = path.split('.');
    let first = segments.next().unwrap_or(path);
    let mut value = accessor(source, first);
    for segment in segments {
        value = accessor(&value, segment);
    }
    value
}

enum FieldSource {
    /// Extract via the accessor from a dot-separated path.
    Path(String),
    /// Compute from the whole source value.
    Custom(MapperFn),
}

/// Builder for a declarative mapper: target fields drawn from source paths,
/// optionally converted, with `Null` results omitted unless requested.
///
/// `build` produces a plain [`MapperFn`]; the declaration itself is gone by
/// the time requests flow.
pub struct SimpleMapping {
    type_id: String,
    action_id: Option<String>,
    plain: BTreeSet<String>,
    custom: BTreeMap<String, FieldSource>,
    converters: HashMap<String, FieldConverter>,
    include_none: bool,
    accessor: GetFieldFn,
}

impl SimpleMapping {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            action_id: None,
            plain: BTreeSet::new(),
            custom: BTreeMap::new(),
            converters: HashMap::new(),
            include_none: false,
            accessor: Arc::new(get_field_entry),
        }
    }

    /// Set the action this mapper is registered under.
    pub fn action(mut self, action_id: impl Into<String>) -> Self {
        self.action_id = Some(action_id.into());
        self
    }

    /// Keep `Null` values in the output instead of omitting them.
    pub fn include_none(mut self, include: bool) -> Self {
        self.include_none = include;
        self
    }

    /// Map each named field from the identically-named source entry.
    ///
    /// Plain fields win over a custom declaration for the same target.
    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.plain.insert(name.into());
        }
        self
    }

    /// Map one target field from a (possibly dot-separated) source path.
    pub fn field(mut self, target: impl Into<String>, source: impl Into<String>) -> Self {
        self.custom
            .insert(target.into(), FieldSource::Path(source.into()));
        self
    }

    /// Compute one target field from the whole source value.
    pub fn custom(mut self, target: impl Into<String>, mapper: MapperFn) -> Self {
        self.custom
            .insert(target.into(), FieldSource::Custom(mapper));
        self
    }

    /// Convert the extracted value of one path-mapped field.
    pub fn convert(mut self, target: impl Into<String>, converter: FieldConverter) -> Self {
        self.converters.insert(target.into(), converter);
        self
    }

    /// Replace the per-segment accessor used for path extraction.
    pub fn accessor(mut self, accessor: GetFieldFn) -> Self {
        self.accessor = accessor;
        self
    }

    /// Validate the declaration and produce the mapper.
    pub fn build(self) -> Result<MapperFn, ConfigError> {
        if self.plain.is_empty() && self.custom.is_empty() {
            return Err(ConfigError::EmptyMapping(self.type_id));
        }
        let mut fields = self.custom;
        for name in self.plain {
            fields.insert(name.clone(), FieldSource::Path(name));
        }
        let mut orphans: Vec<String> = self
            .converters
            .keys()
            .filter(|target| !matches!(fields.get(*target), Some(FieldSource::Path(_))))
            .cloned()
            .collect();
        if !orphans.is_empty() {
            orphans.sort_unstable();
            return Err(ConfigError::UnknownConverters(orphans));
        }

        let converters = self.converters;
        let include_none = self.include_none;
        let accessor = self.accessor;

        Ok(Arc::new(move |source: &Value| {
            let mut target = Map::new();
            for (name, field_source) in &fields {
                let mut value = match field_source {
                    FieldSource::Path(path) => get_path(source, path, &accessor),
                    FieldSource::Custom(mapper) => mapper(source),
                };
                if let Some(converter) = converters.get(name) {
                    value = converter(&value);
                }
                if value.is_null() && !include_none {
                    continue;
                }
                target.insert(name.clone(), value);
            }
            Value::Object(target)
        }))
    }

    /// Build and register in one go.
    pub fn register(self, registry: &mut MapperRegistry) -> Result<(), ConfigError> {
        let type_id = self.type_id.clone();
        let action_id = self.action_id.clone();
        let mapper = self.build()?;
        registry.register(&type_id, action_id.as_deref(), mapper)
    }
}
