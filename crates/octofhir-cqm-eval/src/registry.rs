//! Measure registry
//!
//! Measures are registered once at process start and shared read-only
//! afterwards. Registration validates every codeset reference against a
//! frozen matcher, so a misconfigured measure never reaches a patient.

use crate::definition::MeasureDefinition;
use indexmap::IndexMap;
use octofhir_cqm_diagnostics::ConfigurationError;
use octofhir_cqm_model::CodesetMatcher;
use parking_lot::RwLock;
use std::sync::Arc;

/// Thread-safe registry of validated measure definitions
#[derive(Clone)]
pub struct MeasureRegistry {
    matcher: Arc<dyn CodesetMatcher>,
    measures: Arc<RwLock<IndexMap<String, Arc<MeasureDefinition>>>>,
}

impl std::fmt::Debug for MeasureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasureRegistry")
            .field("measures", &self.ids())
            .finish_non_exhaustive()
    }
}

impl MeasureRegistry {
    /// Create an empty registry validating against `matcher`.
    ///
    /// The matcher is frozen: codesets validated at registration cannot change afterwards.
    pub fn new(matcher: Arc<dyn CodesetMatcher>) -> Self {
        matcher.freeze();
        Self {
            matcher,
            measures: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    /// Validate and register a measure
    pub fn register(&self, definition: MeasureDefinition) -> Result<Arc<MeasureDefinition>, ConfigurationError> {
        definition.validate(self.matcher.as_ref())?;
        let id = definition.id().to_string();
        let mut measures = self.measures.write();
        if measures.contains_key(&id) {
            return Err(ConfigurationError::DuplicateMeasure { measure: id });
        }
        let definition = Arc::new(definition);
        log::debug!("Registered measure {} ({})", id, definition.metadata.title);
        measures.insert(id, Arc::clone(&definition));
        Ok(definition)
    }

    pub fn get(&self, id: &str) -> Option<Arc<MeasureDefinition>> {
        self.measures.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.measures.read().contains_key(id)
    }

    /// Registered identifiers, in registration order
    pub fn ids(&self) -> Vec<String> {
        self.measures.read().keys().cloned().collect()
    }

    /// Registered measures, in registration order
    pub fn measures(&self) -> Vec<Arc<MeasureDefinition>> {
        self.measures.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.measures.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.read().is_empty()
    }

    /// Matcher the registry validates against
    pub fn matcher(&self) -> Arc<dyn CodesetMatcher> {
        Arc::clone(&self.matcher)
    }
}
