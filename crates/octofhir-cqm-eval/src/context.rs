//! Per-evaluation context
//!
//! One context exists per `(patient, timeframe, measure)` evaluation. It owns
//! the memo cache of resolved evidence rules, so memoization is explicit and
//! nothing is shared between concurrent evaluations.

use crate::evidence::{EvidenceMatch, EvidenceRule, RuleId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use octofhir_cqm_model::{CodesetMatcher, CodesetRef, EventQuery, TimelineStore};
use octofhir_cqm_types::{EventCategory, Patient, Timeframe};
use serde::{Deserialize, Serialize};

/// Where the result will be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Point-of-care guidance; visit requirements are waived
    #[default]
    Guidance,
    /// Quality reporting; every initial-population criterion applies
    Report,
}

/// Engine-wide evaluation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOptions {
    #[serde(default)]
    pub mode: EvaluationMode,
    /// Force every evidence window to be exactly the reporting timeframe
    #[serde(default)]
    pub period_adjustment: bool,
    /// Instant due dates are measured from; the wall clock when unset
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

impl EvaluationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_period_adjustment(mut self, period_adjustment: bool) -> Self {
        self.period_adjustment = period_adjustment;
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

/// State carried through one evaluation
pub struct EvaluationContext<'a> {
    store: &'a dyn TimelineStore,
    matcher: &'a dyn CodesetMatcher,
    rules: &'a IndexMap<RuleId, EvidenceRule>,
    timeframe: Timeframe,
    options: EvaluationOptions,
    now: DateTime<Utc>,
    /// Resolved rules in resolution order
    memo: IndexMap<RuleId, Option<EvidenceMatch>>,
    /// Rules currently being resolved, for anchor chains
    resolving: Vec<RuleId>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(
        store: &'a dyn TimelineStore,
        matcher: &'a dyn CodesetMatcher,
        rules: &'a IndexMap<RuleId, EvidenceRule>,
        timeframe: Timeframe,
        options: EvaluationOptions,
    ) -> Self {
        Self {
            store,
            matcher,
            rules,
            timeframe,
            options,
            now: options.now.unwrap_or_else(Utc::now),
            memo: IndexMap::new(),
            resolving: Vec::new(),
        }
    }

    pub fn patient(&self) -> &'a Patient {
        self.store.patient()
    }

    /// The reporting timeframe
    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn options(&self) -> EvaluationOptions {
        self.options
    }

    pub fn mode(&self) -> EvaluationMode {
        self.options.mode
    }

    pub fn matcher(&self) -> &'a dyn CodesetMatcher {
        self.matcher
    }

    /// Start a `find(codesets, categories)` query against the timeline
    pub fn find<'q>(
        &self,
        codesets: &'q CodesetRef,
        categories: &'q [EventCategory],
    ) -> EventQuery<'q>
    where
        'a: 'q,
    {
        EventQuery::new(self.store, self.matcher, codesets, categories)
    }

    /// Look up a declared evidence rule
    pub fn rule(&self, id: &RuleId) -> Option<&'a EvidenceRule> {
        self.rules.get(id)
    }

    pub(crate) fn memoized(&self, id: &RuleId) -> Option<&Option<EvidenceMatch>> {
        self.memo.get(id)
    }

    pub(crate) fn memoize(&mut self, id: RuleId, outcome: Option<EvidenceMatch>) {
        self.memo.insert(id, outcome);
    }

    /// Mark `id` as being resolved; false if it already is (a cycle)
    pub(crate) fn enter(&mut self, id: &RuleId) -> bool {
        if self.resolving.contains(id) {
            return false;
        }
        self.resolving.push(id.clone());
        true
    }

    pub(crate) fn leave(&mut self, id: &RuleId) {
        self.resolving.retain(|r| r != id);
    }

    /// Rules searched so far, in the order they were first resolved
    pub fn queried_rules(&self) -> impl Iterator<Item = &RuleId> {
        self.memo.keys()
    }

    pub fn was_queried(&self, id: &RuleId) -> bool {
        self.memo.contains_key(id)
    }
}
