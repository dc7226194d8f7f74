//! Codeset catalog implementing CodesetMatcher
//!
//! Holds named value sets as plain code lists, loaded from JSON documents of
//! the form `{"codesets": {"Name": {"description": "..", "codes": [{"system": "..", "code": ".."}]}}}`.

use crate::provider::CodesetMatcher;
use indexmap::IndexMap;
use octofhir_cqm_diagnostics::ConfigurationError;
use octofhir_cqm_types::{ClinicalEvent, Coding};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A single named value set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodesetEntry {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub codes: Vec<Coding>,
}

impl CodesetEntry {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            codes: Vec::new(),
        }
    }

    pub fn with_code(mut self, system: impl Into<String>, code: impl Into<String>) -> Self {
        self.codes.push(Coding::new(system, code));
        self
    }

    /// Whether `coding` is listed, comparing system and code only
    pub fn contains(&self, coding: &Coding) -> bool {
        self.codes
            .iter()
            .any(|c| c.system == coding.system && c.code == coding.code)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    codesets: IndexMap<String, CodesetEntry>,
}

/// Catalog of named codesets that implements [`CodesetMatcher`].
///
/// An event belongs to a codeset when it is tagged with the codeset name or
/// carries one of the codeset's codes. Cloning shares the underlying catalog.
///
/// A measure registry freezes the catalog it validates against; after that,
/// [`define`](Self::define) and [`extend_from`](Self::extend_from) fail with
/// [`ConfigurationError::CatalogFrozen`].
#[derive(Debug, Clone, Default)]
pub struct CodesetCatalog {
    entries: Arc<RwLock<IndexMap<String, CodesetEntry>>>,
    frozen: Arc<AtomicBool>,
}

impl CodesetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a codeset
    pub fn define(&self, name: impl Into<String>, entry: CodesetEntry) -> Result<(), ConfigurationError> {
        let name = name.into();
        let mut entries = self.entries.write();
        if self.is_frozen() {
            return Err(ConfigurationError::CatalogFrozen { codeset: name });
        }
        entries.insert(name, entry);
        Ok(())
    }

    pub fn with_codeset(self, name: impl Into<String>, entry: CodesetEntry) -> Result<Self, ConfigurationError> {
        self.define(name, entry)?;
        Ok(self)
    }

    /// Copy every codeset of `other` into this catalog
    pub fn extend_from(&self, other: &CodesetCatalog) -> Result<(), ConfigurationError> {
        let incoming = other.entries.read().clone();
        let mut entries = self.entries.write();
        if self.is_frozen() {
            let codeset = incoming.keys().next().cloned().unwrap_or_default();
            return Err(ConfigurationError::CatalogFrozen { codeset });
        }
        entries.extend(incoming);
        Ok(())
    }

    /// Whether the catalog still accepts definitions
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Load a catalog from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let document: CatalogDocument = serde_json::from_str(json)
            .map_err(|e| ConfigurationError::invalid_catalog(e.to_string()))?;
        log::debug!("Loaded codeset catalog with {} codesets", document.codesets.len());
        Ok(Self {
            entries: Arc::new(RwLock::new(document.codesets)),
            frozen: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Load a catalog from a JSON file at runtime
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let json =
            std::fs::read_to_string(path).map_err(|e| ConfigurationError::io(path.display(), e))?;
        Self::from_json(&json)
    }

    /// Load a catalog from file based on extension (only `.json` is understood)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Err(ConfigurationError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }

    /// Serialize the catalog back to its JSON document form
    pub fn to_json(&self) -> Result<String, ConfigurationError> {
        let document = CatalogDocument {
            codesets: self.entries.read().clone(),
        };
        serde_json::to_string_pretty(&document)
            .map_err(|e| ConfigurationError::invalid_catalog(e.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<CodesetEntry> {
        self.entries.read().get(name).cloned()
    }

    /// Codeset names in definition order
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CodesetMatcher for CodesetCatalog {
    fn belongs_to(&self, event: &ClinicalEvent, codeset: &str) -> bool {
        if event.concepts.contains(codeset) {
            return true;
        }
        let entries = self.entries.read();
        entries
            .get(codeset)
            .is_some_and(|entry| event.codes.iter().any(|coding| entry.contains(coding)))
    }

    fn is_defined(&self, codeset: &str) -> bool {
        self.entries.read().contains_key(codeset)
    }

    fn freeze(&self) {
        let _entries = self.entries.write();
        self.frozen.store(true, Ordering::Release);
        log::debug!("Codeset catalog frozen");
    }
}
