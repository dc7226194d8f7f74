//! Measure definitions
//!
//! A [`MeasureDefinition`] is a plain value assembled once by a measure author
//! and shared read-only across evaluations. Structural problems are rejected
//! by [`MeasureDefinitionBuilder::build`]; codeset references are checked
//! against a catalog by [`MeasureDefinition::validate`] at registration.

use crate::evidence::{EvidenceRule, RuleId};
use crate::population::{Criterion, NumeratorCriteria, PopulationDefinition};
use crate::predicate::{AllOf, Predicate};
use indexmap::{IndexMap, IndexSet};
use octofhir_cqm_diagnostics::ConfigurationError;
use octofhir_cqm_model::{CodesetMatcher, CodesetRef};
use octofhir_cqm_types::{Lookback, PopulationId};
use serde::{Deserialize, Serialize};

/// Descriptive metadata of a measure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureMetadata {
    /// Identifier, e.g. `CMS130v6`
    pub id: String,
    pub title: String,
    pub version: String,
    pub description: String,
    /// Link to the published specification
    pub information: String,
    /// How far back a chart display should look by default
    pub default_display_interval_days: u32,
}

impl MeasureMetadata {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn information(mut self, information: impl Into<String>) -> Self {
        self.information = information.into();
        self
    }

    pub fn display_interval_days(mut self, days: u32) -> Self {
        self.default_display_interval_days = days;
        self
    }
}

/// Everything the engine needs to evaluate one measure
#[derive(Debug)]
pub struct MeasureDefinition {
    pub metadata: MeasureMetadata,
    /// Shared initial-population predicate
    pub initial: Box<dyn Predicate>,
    /// Exclusions applying to every population
    pub exclusions: Vec<Criterion>,
    /// Exceptions applying to every population
    pub exceptions: Vec<Criterion>,
    /// Evidence rules by identifier, in declaration order
    pub rules: IndexMap<RuleId, EvidenceRule>,
    /// Populations in evaluation order
    pub populations: Vec<PopulationDefinition>,
    /// Population whose verdict decides the result
    pub reporting: PopulationId,
    /// Interval cited in due narratives
    pub screening_interval: Option<Lookback>,
}

impl MeasureDefinition {
    pub fn builder(metadata: MeasureMetadata) -> MeasureDefinitionBuilder {
        MeasureDefinitionBuilder::new(metadata)
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn population(&self, id: &PopulationId) -> Option<&PopulationDefinition> {
        self.populations.iter().find(|p| &p.id == id)
    }

    pub fn reporting_population(&self) -> Option<&PopulationDefinition> {
        self.population(&self.reporting)
    }

    pub fn rule(&self, id: &RuleId) -> Option<&EvidenceRule> {
        self.rules.get(id)
    }

    /// Check every codeset the measure references against `matcher`
    pub fn validate(&self, matcher: &dyn CodesetMatcher) -> Result<(), ConfigurationError> {
        let check = |codesets: &CodesetRef, referenced_by: String| -> Result<(), ConfigurationError> {
            match codesets.iter().find(|codeset| !matcher.is_defined(codeset)) {
                Some(missing) => Err(ConfigurationError::undefined_codeset(self.id(), referenced_by, missing)),
                None => Ok(()),
            }
        };

        for rule in self.rules.values() {
            check(&rule.codesets, format!("rule {}", rule.id))?;
            if let Some(qualifier) = &rule.qualifier {
                check(qualifier, format!("rule {} qualifier", rule.id))?;
            }
        }
        for codesets in self.initial.codesets() {
            check(codesets, "initial population".to_string())?;
        }
        for criterion in self.criteria() {
            for codesets in criterion.predicate.codesets() {
                check(codesets, format!("criterion {}", criterion.id))?;
            }
        }
        Ok(())
    }

    /// Every measure-level and population-level criterion
    pub fn criteria(&self) -> impl Iterator<Item = &Criterion> {
        self.exclusions
            .iter()
            .chain(&self.exceptions)
            .chain(self.populations.iter().flat_map(|p| p.criteria()))
    }

    /// Structural checks that do not need a catalog
    fn check_structure(&self) -> Result<(), ConfigurationError> {
        let measure = self.id();
        if self.populations.is_empty() {
            return Err(ConfigurationError::NoPopulations {
                measure: measure.to_string(),
            });
        }

        for rule in self.rules.values() {
            if let Some(anchor) = &rule.anchor {
                if !self.rules.contains_key(anchor) {
                    return Err(ConfigurationError::unknown_rule(
                        measure,
                        format!("rule {}", rule.id),
                        anchor.as_str(),
                    ));
                }
            }
        }
        for rule in self.rules.values() {
            self.check_anchor_chain(rule)?;
        }

        for rule in self.initial.rules() {
            self.check_rule_reference(rule, "initial population")?;
        }
        for criterion in self.criteria() {
            for rule in criterion.predicate.rules() {
                self.check_rule_reference(rule, &format!("criterion {}", criterion.id))?;
            }
        }

        let mut declared: IndexSet<&PopulationId> = IndexSet::new();
        for population in &self.populations {
            if !declared.insert(&population.id) {
                return Err(ConfigurationError::DuplicatePopulation {
                    measure: measure.to_string(),
                    population: population.id.to_string(),
                });
            }
            match &population.numerator {
                NumeratorCriteria::Evidence(rules) => {
                    if rules.is_empty() {
                        return Err(ConfigurationError::EmptyEvidence {
                            measure: measure.to_string(),
                            population: population.id.to_string(),
                        });
                    }
                    for rule in rules {
                        self.check_rule_reference(rule, &format!("population {}", population.id))?;
                    }
                }
                NumeratorCriteria::AllApplicable(dependencies) => {
                    for dependency in dependencies {
                        self.check_dependency(population, dependency, &declared)?;
                    }
                }
            }
        }

        if self.reporting_population().is_none() {
            return Err(ConfigurationError::MissingReportingPopulation {
                measure: measure.to_string(),
                population: self.reporting.to_string(),
            });
        }
        Ok(())
    }

    fn check_rule_reference(&self, rule: &RuleId, referenced_by: &str) -> Result<(), ConfigurationError> {
        if self.rules.contains_key(rule) {
            Ok(())
        } else {
            Err(ConfigurationError::unknown_rule(self.id(), referenced_by, rule.as_str()))
        }
    }

    fn check_anchor_chain(&self, rule: &EvidenceRule) -> Result<(), ConfigurationError> {
        let mut seen = vec![&rule.id];
        let mut current = rule;
        while let Some(anchor) = &current.anchor {
            if seen.contains(&anchor) {
                return Err(ConfigurationError::CyclicAnchor {
                    measure: self.id().to_string(),
                    rule: rule.id.to_string(),
                });
            }
            seen.push(anchor);
            match self.rules.get(anchor) {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(())
    }

    /// A composite may only combine evidence populations declared before it
    fn check_dependency(
        &self,
        population: &PopulationDefinition,
        dependency: &PopulationId,
        declared_so_far: &IndexSet<&PopulationId>,
    ) -> Result<(), ConfigurationError> {
        let invalid = || ConfigurationError::InvalidDependency {
            measure: self.id().to_string(),
            population: population.id.to_string(),
            dependency: dependency.to_string(),
        };
        let Some(target) = self.population(dependency) else {
            return Err(ConfigurationError::unknown_population(
                self.id(),
                format!("population {}", population.id),
                dependency.as_str(),
            ));
        };
        if dependency == &population.id || !declared_so_far.contains(dependency) || target.is_composite() {
            return Err(invalid());
        }
        Ok(())
    }
}

/// Builder for [`MeasureDefinition`]
#[derive(Debug)]
pub struct MeasureDefinitionBuilder {
    metadata: MeasureMetadata,
    initial: Option<Box<dyn Predicate>>,
    exclusions: Vec<Criterion>,
    exceptions: Vec<Criterion>,
    rules: IndexMap<RuleId, EvidenceRule>,
    populations: Vec<PopulationDefinition>,
    reporting: Option<PopulationId>,
    screening_interval: Option<Lookback>,
    duplicate_rule: Option<RuleId>,
}

impl MeasureDefinitionBuilder {
    pub fn new(metadata: MeasureMetadata) -> Self {
        Self {
            metadata,
            initial: None,
            exclusions: Vec::new(),
            exceptions: Vec::new(),
            rules: IndexMap::new(),
            populations: Vec::new(),
            reporting: None,
            screening_interval: None,
            duplicate_rule: None,
        }
    }

    /// Initial-population predicate; defaults to always met
    pub fn initial_population(mut self, predicate: impl Predicate + 'static) -> Self {
        self.initial = Some(Box::new(predicate));
        self
    }

    pub fn exclusion(mut self, criterion: Criterion) -> Self {
        self.exclusions.push(criterion);
        self
    }

    pub fn exception(mut self, criterion: Criterion) -> Self {
        self.exceptions.push(criterion);
        self
    }

    pub fn rule(mut self, rule: EvidenceRule) -> Self {
        if self.rules.contains_key(&rule.id) && self.duplicate_rule.is_none() {
            self.duplicate_rule = Some(rule.id.clone());
        }
        self.rules.insert(rule.id.clone(), rule);
        self
    }

    /// Add a population; the first one added reports unless [`Self::reporting`] says otherwise
    pub fn population(mut self, population: PopulationDefinition) -> Self {
        self.populations.push(population);
        self
    }

    pub fn reporting(mut self, population: impl Into<PopulationId>) -> Self {
        self.reporting = Some(population.into());
        self
    }

    pub fn screening_interval(mut self, interval: Lookback) -> Self {
        self.screening_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<MeasureDefinition, ConfigurationError> {
        if let Some(rule) = self.duplicate_rule {
            return Err(ConfigurationError::DuplicateRule {
                measure: self.metadata.id,
                rule: rule.to_string(),
            });
        }
        let reporting = self
            .reporting
            .or_else(|| self.populations.first().map(|p| p.id.clone()))
            .unwrap_or_else(|| PopulationId::new(""));
        let definition = MeasureDefinition {
            metadata: self.metadata,
            initial: self.initial.unwrap_or_else(|| Box::new(AllOf::new())),
            exclusions: self.exclusions,
            exceptions: self.exceptions,
            rules: self.rules,
            populations: self.populations,
            reporting,
            screening_interval: self.screening_interval,
        };
        definition.check_structure()?;
        Ok(definition)
    }
}
