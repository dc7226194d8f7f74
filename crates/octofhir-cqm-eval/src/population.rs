//! Sub-population definitions and the population classifier
//!
//! Every named sub-population moves through three gates: the shared initial
//! population, its own denominator (prerequisites, exclusions, exceptions)
//! and its numerator (evidence rules, or the verdicts of other populations
//! for composites). States only move forward; see [`PopulationState`].

use crate::context::EvaluationContext;
use crate::definition::MeasureDefinition;
use crate::error::{EvalError, EvalResult};
use crate::evidence::{EvidenceMatch, EvidenceResolver, RuleId};
use crate::predicate::{Predicate, Verdict};
use indexmap::IndexMap;
use octofhir_cqm_types::{PopulationId, PopulationState};

/// A named predicate used as a prerequisite, exclusion or exception
#[derive(Debug)]
pub struct Criterion {
    pub id: String,
    /// Human-readable reason, e.g. "in hospice care during the measurement period"
    pub description: String,
    pub predicate: Box<dyn Predicate>,
}

impl Criterion {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        predicate: impl Predicate + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            predicate: Box::new(predicate),
        }
    }
}

/// How a population's numerator is decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumeratorCriteria {
    /// Evidence rules in priority order; the first match wins
    Evidence(Vec<RuleId>),
    /// Composite: every listed population that applies to the patient is in its numerator
    AllApplicable(Vec<PopulationId>),
}

/// Narrative emitted when this population is the reason a patient is due
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueNarrative {
    /// Template with a `{name}` placeholder
    pub headline: String,
    /// Cite the most recent relevant event on record
    pub cite_history: bool,
    /// Add the measure's screening-interval line
    pub cite_interval: bool,
}

impl DueNarrative {
    pub fn new(headline: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            cite_history: false,
            cite_interval: false,
        }
    }

    pub fn with_history(mut self) -> Self {
        self.cite_history = true;
        self
    }

    pub fn with_interval(mut self) -> Self {
        self.cite_interval = true;
        self
    }
}

/// Declaration of one named sub-population
#[derive(Debug)]
pub struct PopulationDefinition {
    pub id: PopulationId,
    pub title: String,
    /// Must all be met to enter the denominator; indeterminate counts as unmet
    pub prerequisites: Vec<Criterion>,
    /// Any met exclusion removes the patient; indeterminate does not
    pub exclusions: Vec<Criterion>,
    pub exceptions: Vec<Criterion>,
    pub numerator: NumeratorCriteria,
    pub due: DueNarrative,
}

impl PopulationDefinition {
    /// Population whose numerator is decided by evidence rules
    pub fn evidence(
        id: impl Into<String>,
        title: impl Into<String>,
        rules: impl IntoIterator<Item = impl Into<RuleId>>,
    ) -> Self {
        Self::with_numerator(
            id,
            title,
            NumeratorCriteria::Evidence(rules.into_iter().map(Into::into).collect()),
        )
    }

    /// Population whose numerator combines the verdicts of earlier populations
    pub fn composite(
        id: impl Into<String>,
        title: impl Into<String>,
        dependencies: impl IntoIterator<Item = impl Into<PopulationId>>,
    ) -> Self {
        Self::with_numerator(
            id,
            title,
            NumeratorCriteria::AllApplicable(dependencies.into_iter().map(Into::into).collect()),
        )
    }

    fn with_numerator(id: impl Into<String>, title: impl Into<String>, numerator: NumeratorCriteria) -> Self {
        let title = title.into();
        Self {
            id: PopulationId::new(id),
            due: DueNarrative::new(format!("{{name}} is due for {}.", title)),
            title,
            prerequisites: Vec::new(),
            exclusions: Vec::new(),
            exceptions: Vec::new(),
            numerator,
        }
    }

    pub fn requires(mut self, criterion: Criterion) -> Self {
        self.prerequisites.push(criterion);
        self
    }

    pub fn excludes(mut self, criterion: Criterion) -> Self {
        self.exclusions.push(criterion);
        self
    }

    pub fn excepts(mut self, criterion: Criterion) -> Self {
        self.exceptions.push(criterion);
        self
    }

    pub fn when_due(mut self, due: DueNarrative) -> Self {
        self.due = due;
        self
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.numerator, NumeratorCriteria::AllApplicable(_))
    }

    /// Evidence rules of this population, empty for composites
    pub fn evidence_rules(&self) -> &[RuleId] {
        match &self.numerator {
            NumeratorCriteria::Evidence(rules) => rules,
            NumeratorCriteria::AllApplicable(_) => &[],
        }
    }

    pub fn criteria(&self) -> impl Iterator<Item = &Criterion> {
        self.prerequisites
            .iter()
            .chain(&self.exclusions)
            .chain(&self.exceptions)
    }
}

/// Per-evaluation state of one sub-population
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population {
    id: PopulationId,
    state: PopulationState,
    reason: Option<String>,
    evidence: Option<EvidenceMatch>,
}

impl Population {
    /// Start a population from the shared initial-population verdict
    pub fn new(id: PopulationId, in_initial: bool) -> Self {
        let state = if in_initial {
            PopulationState::InInitial
        } else {
            PopulationState::NotInInitial
        };
        Self {
            id,
            state,
            reason: None,
            evidence: None,
        }
    }

    pub fn id(&self) -> &PopulationId {
        &self.id
    }

    pub fn state(&self) -> PopulationState {
        self.state
    }

    /// Why the population was excluded, when it was
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Evidence cited for a numerator population
    pub fn evidence(&self) -> Option<&EvidenceMatch> {
        self.evidence.as_ref()
    }

    /// Move to `next` if the transition is allowed; rejected moves are logged and ignored
    pub fn transition(&mut self, next: PopulationState) -> bool {
        if self.state.can_transition_to(next) {
            log::trace!("Population '{}': {} -> {}", self.id, self.state, next);
            self.state = next;
            true
        } else {
            log::warn!(
                "Population '{}': rejected transition {} -> {}",
                self.id,
                self.state,
                next
            );
            false
        }
    }

    pub fn admit(&mut self) -> bool {
        self.transition(PopulationState::InDenominator)
    }

    pub fn exclude(&mut self, reason: impl Into<String>) -> bool {
        let moved = self.transition(PopulationState::ExcludedFromDenominator);
        if moved {
            self.reason = Some(reason.into());
        }
        moved
    }

    pub fn satisfy(&mut self, evidence: Option<EvidenceMatch>) -> bool {
        let moved = self.transition(PopulationState::InNumerator);
        if moved {
            self.evidence = evidence;
        }
        moved
    }

    pub fn fail(&mut self) -> bool {
        self.transition(PopulationState::NotInNumerator)
    }
}

/// Final per-population verdicts of one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Verdict of the initial-population predicate, shared by all populations
    pub initial: Verdict,
    /// Measure-level exclusion or exception that applied, if any
    pub measure_exclusion: Option<String>,
    pub populations: IndexMap<PopulationId, Population>,
}

impl Classification {
    pub fn get(&self, id: &PopulationId) -> EvalResult<&Population> {
        self.populations
            .get(id)
            .ok_or_else(|| EvalError::unknown_population(id.as_str()))
    }

    pub fn state(&self, id: &str) -> Option<PopulationState> {
        self.populations
            .get(&PopulationId::new(id))
            .map(Population::state)
    }
}

/// Runs the three gates for every population of a measure
pub struct PopulationClassifier;

impl PopulationClassifier {
    pub fn classify(definition: &MeasureDefinition, ctx: &mut EvaluationContext<'_>) -> EvalResult<Classification> {
        let initial = definition.initial.evaluate(ctx)?;
        if let Verdict::Indeterminate(reason) = &initial {
            log::warn!(
                "Measure {}: initial population indeterminate for patient {}: {}",
                definition.id(),
                ctx.patient().id,
                reason
            );
        }
        let in_initial = initial.is_met();
        log::debug!(
            "Measure {}: initial population {} for patient {}",
            definition.id(),
            initial,
            ctx.patient().id
        );

        let mut populations: IndexMap<PopulationId, Population> = definition
            .populations
            .iter()
            .map(|p| (p.id.clone(), Population::new(p.id.clone(), in_initial)))
            .collect();

        let mut classification = Classification {
            initial,
            measure_exclusion: None,
            populations: IndexMap::new(),
        };
        if !in_initial {
            classification.populations = populations;
            return Ok(classification);
        }

        let mut measure_exclusion = Self::first_applicable(&definition.exclusions, ctx, "exclusion")?;
        if measure_exclusion.is_none() {
            measure_exclusion = Self::first_applicable(&definition.exceptions, ctx, "exception")?;
        }
        classification.measure_exclusion = measure_exclusion;

        for population_def in &definition.populations {
            let reason = match &classification.measure_exclusion {
                Some(reason) => Some(reason.clone()),
                None => Self::denominator_gate(population_def, ctx)?,
            };
            let population = populations
                .get_mut(&population_def.id)
                .ok_or_else(|| EvalError::unknown_population(population_def.id.as_str()))?;
            match reason {
                Some(reason) => {
                    log::debug!("Population '{}' excluded: {}", population_def.id, reason);
                    population.exclude(reason);
                }
                None => {
                    population.admit();
                }
            }
        }

        for population_def in &definition.populations {
            let in_denominator = populations
                .get(&population_def.id)
                .is_some_and(|p| p.state() == PopulationState::InDenominator);
            if !in_denominator {
                continue;
            }
            let outcome = match &population_def.numerator {
                NumeratorCriteria::Evidence(rules) => EvidenceResolver::resolve(ctx, rules)?.map(Some),
                NumeratorCriteria::AllApplicable(dependencies) => {
                    Self::combine(&populations, dependencies)?
                }
            };
            let population = populations
                .get_mut(&population_def.id)
                .ok_or_else(|| EvalError::unknown_population(population_def.id.as_str()))?;
            match outcome {
                Some(evidence) => {
                    population.satisfy(evidence);
                }
                None => {
                    population.fail();
                }
            }
        }

        classification.populations = populations;
        Ok(classification)
    }

    /// Reason the population stays out of the denominator, if any
    fn denominator_gate(
        population: &PopulationDefinition,
        ctx: &mut EvaluationContext<'_>,
    ) -> EvalResult<Option<String>> {
        for prerequisite in &population.prerequisites {
            match prerequisite.predicate.evaluate(ctx)? {
                Verdict::Met => {}
                Verdict::NotMet => return Ok(Some(format!("not {}", prerequisite.description))),
                Verdict::Indeterminate(reason) => {
                    return Ok(Some(format!(
                        "cannot determine whether {} ({})",
                        prerequisite.description, reason
                    )));
                }
            }
        }
        if let Some(reason) = Self::first_applicable(&population.exclusions, ctx, "exclusion")? {
            return Ok(Some(reason));
        }
        Self::first_applicable(&population.exceptions, ctx, "exception")
    }

    /// Description of the first met criterion; indeterminate criteria do not apply
    fn first_applicable(
        criteria: &[Criterion],
        ctx: &mut EvaluationContext<'_>,
        kind: &str,
    ) -> EvalResult<Option<String>> {
        for criterion in criteria {
            match criterion.predicate.evaluate(ctx)? {
                Verdict::Met => return Ok(Some(criterion.description.clone())),
                Verdict::NotMet => {}
                Verdict::Indeterminate(reason) => {
                    log::warn!("{} '{}' indeterminate, not applied: {}", kind, criterion.id, reason);
                }
            }
        }
        Ok(None)
    }

    /// Numerator of a composite population.
    ///
    /// `Some(evidence)` when every dependency that applies is in its numerator,
    /// citing the evidence of the last applicable dependency.
    fn combine(
        populations: &IndexMap<PopulationId, Population>,
        dependencies: &[PopulationId],
    ) -> EvalResult<Option<Option<EvidenceMatch>>> {
        let mut cited = None;
        for dependency in dependencies {
            let population = populations
                .get(dependency)
                .ok_or_else(|| EvalError::unknown_population(dependency.as_str()))?;
            match population.state() {
                PopulationState::InNumerator => cited = population.evidence().cloned(),
                state if state.in_denominator() => return Ok(None),
                _ => {}
            }
        }
        Ok(Some(cited))
    }
}
