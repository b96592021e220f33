//! Keyed processor registries shared across endpoint definitions.

use std::collections::HashMap;

use crate::error::ConfigError;

/// Compose the lookup key for a `(type_id, action_id)` pair.
pub(crate) fn processor_key(type_id: &str, action_id: Option<&str>) -> String {
    match action_id {
        Some(action) => format!("{type_id}:{action}"),
        None => type_id.to_string(),
    }
}

/// A start-up-populated map of processors keyed by type and optional action.
///
/// Registration validates keys and rejects duplicates; lookup is infallible
/// and returns `None` for anything unregistered, including keys that could
/// never have been registered.
pub struct ProcessorRegistry<P> {
    name: &'static str,
    entries: HashMap<String, P>,
}

impl<P> ProcessorRegistry<P> {
    /// Empty registry; `name` identifies it in error messages.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
        }
    }

    /// Register a processor under `(type_id, action_id)`.
    pub fn register(
        &mut self,
        type_id: &str,
        action_id: Option<&str>,
        processor: P,
    ) -> Result<(), ConfigError> {
        if type_id.is_empty() {
            return Err(ConfigError::EmptyTypeId);
        }
        if action_id == Some("") {
            return Err(ConfigError::EmptyActionId);
        }
        let key = processor_key(type_id, action_id);
        if self.entries.contains_key(&key) {
            return Err(ConfigError::DuplicateProcessor {
                registry: self.name,
                key,
            });
        }
        tracing::debug!(registry = self.name, key = %key, "registered processor");
        self.entries.insert(key, processor);
        Ok(())
    }

    /// Look up a processor; unknown or malformed keys yield `None`.
    pub fn get(&self, type_id: &str, action_id: Option<&str>) -> Option<&P> {
        if type_id.is_empty() || action_id == Some("") {
            return None;
        }
        self.entries.get(&processor_key(type_id, action_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut registry = ProcessorRegistry::new("mapper");
        registry.register("ticket", Some("input"), 1).unwrap();
        registry.register("ticket", Some("output"), 2).unwrap();
        registry.register("ticket", None, 3).unwrap();

        assert_eq!(registry.get("ticket", Some("input")), Some(&1));
        assert_eq!(registry.get("ticket", Some("output")), Some(&2));
        assert_eq!(registry.get("ticket", None), Some(&3));
        assert_eq!(registry.get("project", Some("input")), None);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_register_rejects_empty_keys() {
        let mut registry = ProcessorRegistry::new("mapper");
        assert_eq!(
            registry.register("", Some("input"), 1).unwrap_err(),
            ConfigError::EmptyTypeId
        );
        assert_eq!(
            registry.register("ticket", Some(""), 1).unwrap_err(),
            ConfigError::EmptyActionId
        );
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = ProcessorRegistry::new("mapper");
        registry.register("ticket", Some("input"), 1).unwrap();
        let err = registry.register("ticket", Some("input"), 2).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateProcessor {
                registry: "mapper",
                key: "ticket:input".to_string(),
            }
        );
    }

    #[test]
    fn test_get_never_errors_on_malformed_keys() {
        let mut registry = ProcessorRegistry::new("mapper");
        registry.register("ticket", None, 1).unwrap();
        assert_eq!(registry.get("", None), None);
        assert_eq!(registry.get("ticket", Some("")), None);
    }

    #[test]
    fn test_bare_and_actioned_keys_do_not_collide() {
        let mut registry = ProcessorRegistry::new("validator");
        registry.register("ticket", None, 1).unwrap();
        registry.register("ticket", Some("input"), 2).unwrap();
        assert_eq!(registry.get("ticket", None), Some(&1));
        assert_eq!(registry.get("ticket", Some("input")), Some(&2));
    }
}
