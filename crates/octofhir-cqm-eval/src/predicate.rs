//! Population predicates with three-valued verdicts
//!
//! Predicates answer "met", "not met" or "indeterminate". Indeterminate
//! covers missing anchor data such as an unknown birth date, and follows the
//! usual three-valued logic:
//!
//! - `and`: not met dominates, then indeterminate
//! - `or`: met dominates, then indeterminate
//! - `not`: indeterminate stays indeterminate

use crate::context::{EvaluationContext, EvaluationMode};
use crate::error::EvalResult;
use crate::evidence::{EvidenceResolver, RuleId};
use octofhir_cqm_model::{CodesetRef, WindowMatch};
use octofhir_cqm_types::{EventCategory, Lookback};
use smallvec::SmallVec;
use std::fmt;

/// Outcome of a predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Met,
    NotMet,
    /// Not enough data to decide; carries the reason
    Indeterminate(String),
}

impl Verdict {
    pub fn from_bool(value: bool) -> Self {
        if value { Verdict::Met } else { Verdict::NotMet }
    }

    pub fn is_met(&self) -> bool {
        matches!(self, Verdict::Met)
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Verdict::Indeterminate(_))
    }

    pub fn and(self, other: Verdict) -> Verdict {
        match (self, other) {
            (Verdict::NotMet, _) | (_, Verdict::NotMet) => Verdict::NotMet,
            (Verdict::Indeterminate(reason), _) | (_, Verdict::Indeterminate(reason)) => {
                Verdict::Indeterminate(reason)
            }
            (Verdict::Met, Verdict::Met) => Verdict::Met,
        }
    }

    pub fn or(self, other: Verdict) -> Verdict {
        match (self, other) {
            (Verdict::Met, _) | (_, Verdict::Met) => Verdict::Met,
            (Verdict::Indeterminate(reason), _) | (_, Verdict::Indeterminate(reason)) => {
                Verdict::Indeterminate(reason)
            }
            (Verdict::NotMet, Verdict::NotMet) => Verdict::NotMet,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Verdict {
        match self {
            Verdict::Met => Verdict::NotMet,
            Verdict::NotMet => Verdict::Met,
            indeterminate => indeterminate,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Met => write!(f, "met"),
            Verdict::NotMet => write!(f, "not met"),
            Verdict::Indeterminate(reason) => write!(f, "indeterminate ({})", reason),
        }
    }
}

/// A criterion evaluated against one patient's timeline.
///
/// Custom predicates may return errors; they propagate to the caller unchanged.
pub trait Predicate: Send + Sync + fmt::Debug {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Verdict>;

    /// Short description used in narratives and logs
    fn describe(&self) -> String;

    /// Codesets referenced, checked against the catalog at registration
    fn codesets(&self) -> Vec<&CodesetRef> {
        Vec::new()
    }

    /// Evidence rules referenced, checked at registration
    fn rules(&self) -> Vec<&RuleId> {
        Vec::new()
    }

    /// Days from the reporting-period end until the predicate would be met by
    /// the passage of time alone, `None` if that cannot happen.
    ///
    /// Criteria that do not depend on time report `Some(0)` so that they
    /// never veto an age-driven date.
    fn days_until_eligible(&self, _ctx: &mut EvaluationContext<'_>) -> EvalResult<Option<i64>> {
        Ok(None)
    }
}

const NO_BIRTH_DATE: &str = "birth date is unknown";

/// Age at the reporting-period end is at least `years`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeAtLeast {
    pub years: u32,
}

impl AgeAtLeast {
    pub fn new(years: u32) -> Self {
        Self { years }
    }
}

impl Predicate for AgeAtLeast {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Verdict> {
        Ok(match ctx.patient().age_at(ctx.timeframe().end()) {
            Some(age) => Verdict::from_bool(age >= self.years as i32),
            None => Verdict::Indeterminate(NO_BIRTH_DATE.to_string()),
        })
    }

    fn describe(&self) -> String {
        format!("aged {} or older", self.years)
    }

    fn days_until_eligible(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Option<i64>> {
        let end = ctx.timeframe().end();
        Ok(ctx
            .patient()
            .days_until_age(self.years, end)
            .filter(|days| *days > 0))
    }
}

/// Age at the reporting-period end within `min..=max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBetween {
    pub min: u32,
    pub max: u32,
}

impl AgeBetween {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

impl Predicate for AgeBetween {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Verdict> {
        Ok(match ctx.patient().age_at(ctx.timeframe().end()) {
            Some(age) => Verdict::from_bool(self.min as i32 <= age && age <= self.max as i32),
            None => Verdict::Indeterminate(NO_BIRTH_DATE.to_string()),
        })
    }

    fn describe(&self) -> String {
        format!("aged {}-{}", self.min, self.max)
    }

    fn days_until_eligible(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Option<i64>> {
        AgeAtLeast::new(self.min).days_until_eligible(ctx)
    }
}

/// At least `min_count` events of `codesets` in the reporting timeframe,
/// optionally widened by a lookback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasEvent {
    pub codesets: CodesetRef,
    pub categories: SmallVec<[EventCategory; 2]>,
    pub lookback: Lookback,
    pub window_match: WindowMatch,
    pub min_count: usize,
}

impl HasEvent {
    pub fn new(codesets: impl Into<CodesetRef>, categories: impl IntoIterator<Item = EventCategory>) -> Self {
        Self {
            codesets: codesets.into(),
            categories: categories.into_iter().collect(),
            lookback: Lookback::ZERO,
            window_match: WindowMatch::Occurred,
            min_count: 1,
        }
    }

    pub fn lookback(mut self, lookback: Lookback) -> Self {
        self.lookback = lookback;
        self
    }

    /// Match events whose active interval overlaps the window
    pub fn intersecting(mut self) -> Self {
        self.window_match = WindowMatch::Intersecting;
        self
    }

    pub fn at_least(mut self, min_count: usize) -> Self {
        self.min_count = min_count;
        self
    }
}

impl Predicate for HasEvent {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Verdict> {
        let window = ctx.timeframe().extended_back(self.lookback);
        let count = ctx
            .find(&self.codesets, &self.categories)
            .matching(window, self.window_match)
            .iter()
            .take(self.min_count)
            .count();
        Ok(Verdict::from_bool(count >= self.min_count))
    }

    fn describe(&self) -> String {
        if self.min_count == 1 {
            format!("has {}", self.codesets)
        } else {
            format!("has at least {} {}", self.min_count, self.codesets)
        }
    }

    fn codesets(&self) -> Vec<&CodesetRef> {
        vec![&self.codesets]
    }

    fn days_until_eligible(&self, _ctx: &mut EvaluationContext<'_>) -> EvalResult<Option<i64>> {
        Ok(Some(0))
    }
}

/// Only enforced in report mode; always met in guidance mode
#[derive(Debug)]
pub struct ReportingOnly {
    pub inner: Box<dyn Predicate>,
}

impl ReportingOnly {
    pub fn new(inner: impl Predicate + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl Predicate for ReportingOnly {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Verdict> {
        match ctx.mode() {
            EvaluationMode::Guidance => Ok(Verdict::Met),
            EvaluationMode::Report => self.inner.evaluate(ctx),
        }
    }

    fn describe(&self) -> String {
        format!("{} (report mode)", self.inner.describe())
    }

    fn codesets(&self) -> Vec<&CodesetRef> {
        self.inner.codesets()
    }

    fn rules(&self) -> Vec<&RuleId> {
        self.inner.rules()
    }

    fn days_until_eligible(&self, _ctx: &mut EvaluationContext<'_>) -> EvalResult<Option<i64>> {
        Ok(Some(0))
    }
}

/// Conjunction; evaluation stops at the first unmet child
#[derive(Debug, Default)]
pub struct AllOf {
    pub children: Vec<Box<dyn Predicate>>,
}

impl AllOf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: impl Predicate + 'static) -> Self {
        self.children.push(Box::new(predicate));
        self
    }
}

impl Predicate for AllOf {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Verdict> {
        let mut verdict = Verdict::Met;
        for child in &self.children {
            verdict = verdict.and(child.evaluate(ctx)?);
            if verdict == Verdict::NotMet {
                break;
            }
        }
        Ok(verdict)
    }

    fn describe(&self) -> String {
        join_descriptions(&self.children, " and ")
    }

    fn codesets(&self) -> Vec<&CodesetRef> {
        self.children.iter().flat_map(|c| c.codesets()).collect()
    }

    fn rules(&self) -> Vec<&RuleId> {
        self.children.iter().flat_map(|c| c.rules()).collect()
    }

    /// Every unmet child must become met with time; the latest of them decides.
    /// Only a date still ahead counts.
    fn days_until_eligible(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Option<i64>> {
        let mut latest: Option<i64> = None;
        for child in &self.children {
            if child.evaluate(ctx)?.is_met() {
                continue;
            }
            match child.days_until_eligible(ctx)? {
                Some(days) => latest = Some(latest.map_or(days, |l| l.max(days))),
                None => return Ok(None),
            }
        }
        Ok(latest.filter(|days| *days > 0))
    }
}

/// Disjunction; evaluation stops at the first met child
#[derive(Debug, Default)]
pub struct AnyOf {
    pub children: Vec<Box<dyn Predicate>>,
}

impl AnyOf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: impl Predicate + 'static) -> Self {
        self.children.push(Box::new(predicate));
        self
    }
}

impl Predicate for AnyOf {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Verdict> {
        let mut verdict = Verdict::NotMet;
        for child in &self.children {
            verdict = verdict.or(child.evaluate(ctx)?);
            if verdict.is_met() {
                break;
            }
        }
        Ok(verdict)
    }

    fn describe(&self) -> String {
        join_descriptions(&self.children, " or ")
    }

    fn codesets(&self) -> Vec<&CodesetRef> {
        self.children.iter().flat_map(|c| c.codesets()).collect()
    }

    fn rules(&self) -> Vec<&RuleId> {
        self.children.iter().flat_map(|c| c.rules()).collect()
    }

    fn days_until_eligible(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Option<i64>> {
        let mut earliest: Option<i64> = None;
        for child in &self.children {
            if let Some(days) = child.days_until_eligible(ctx)? {
                earliest = Some(earliest.map_or(days, |e| e.min(days)));
            }
        }
        Ok(earliest)
    }
}

/// Negation
#[derive(Debug)]
pub struct Not {
    pub inner: Box<dyn Predicate>,
}

impl Not {
    pub fn new(inner: impl Predicate + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl Predicate for Not {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Verdict> {
        Ok(self.inner.evaluate(ctx)?.not())
    }

    fn describe(&self) -> String {
        format!("not {}", self.inner.describe())
    }

    fn codesets(&self) -> Vec<&CodesetRef> {
        self.inner.codesets()
    }

    fn rules(&self) -> Vec<&RuleId> {
        self.inner.rules()
    }
}

/// Met when an evidence rule of the measure yields evidence.
///
/// The rule outcome is memoized in the context, so a population that later
/// uses the same rule as numerator evidence or as an anchor does not search twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatched {
    pub rule: RuleId,
    pub description: String,
}

impl RuleMatched {
    pub fn new(rule: impl Into<RuleId>, description: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            description: description.into(),
        }
    }
}

impl Predicate for RuleMatched {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Verdict> {
        let found = EvidenceResolver::resolve_rule(ctx, &self.rule)?;
        Ok(Verdict::from_bool(found.is_some()))
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    fn rules(&self) -> Vec<&RuleId> {
        vec![&self.rule]
    }
}

fn join_descriptions(children: &[Box<dyn Predicate>], separator: &str) -> String {
    children
        .iter()
        .map(|c| c.describe())
        .collect::<Vec<_>>()
        .join(separator)
}
