//! Evidence rules and the cascading evidence resolver
//!
//! An [`EvidenceRule`] says "search these categories for events in this
//! codeset, within this lookback of the reporting-period end". The
//! [`EvidenceResolver`] walks a population's rules in priority order and
//! stops at the first rule that yields an event.

use crate::context::EvaluationContext;
use crate::error::{EvalError, EvalResult};
use chrono::{DateTime, NaiveTime, Utc};
use octofhir_cqm_model::{CodesetRef, WindowMatch};
use octofhir_cqm_types::{ActionKind, ClinicalEvent, EventCategory, Lookback, SupportingContext, Timeframe};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Identifier of an evidence rule within a measure
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// What to recommend when a rule's evidence is missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remediation {
    pub key: String,
    pub kind: ActionKind,
    pub title: String,
    #[serde(default)]
    pub context: SupportingContext,
}

impl Remediation {
    pub fn new(key: impl Into<String>, kind: ActionKind, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            title: title.into(),
            context: SupportingContext::default(),
        }
    }

    pub fn with_context(mut self, context: SupportingContext) -> Self {
        self.context = context;
        self
    }
}

/// Default narrative used when a rule satisfies a measure
pub const DEFAULT_SATISFIED_NARRATIVE: &str = "{name} had a {label} {date}.";

/// How an anchored rule compares its candidates with the anchor event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorPrecision {
    /// At or after the anchor's exact timestamp
    #[default]
    Instant,
    /// At or after the start (UTC) of the anchor's day
    Day,
}

impl AnchorPrecision {
    fn not_before(self, anchored_at: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            AnchorPrecision::Instant => anchored_at,
            AnchorPrecision::Day => anchored_at.date_naive().and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

/// A single evidence search, in the measure's priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceRule {
    pub id: RuleId,
    /// Human-readable name of the evidence (e.g. "Colonoscopy")
    pub label: String,
    pub codesets: CodesetRef,
    pub categories: SmallVec<[EventCategory; 2]>,
    pub lookback: Lookback,
    /// Restrict this rule's window to the reporting timeframe
    pub period_adjusted: bool,
    pub window_match: WindowMatch,
    /// Only events at or after this rule's matched event count
    pub anchor: Option<RuleId>,
    pub anchor_precision: AnchorPrecision,
    /// The most recent candidate must also belong to one of these codesets
    pub qualifier: Option<CodesetRef>,
    pub remediation: Option<Remediation>,
    /// Template with `{name}`, `{label}` and `{date}` placeholders
    pub narrative: String,
}

impl EvidenceRule {
    pub fn new(id: impl Into<String>, label: impl Into<String>, codesets: impl Into<CodesetRef>) -> Self {
        Self {
            id: RuleId::new(id),
            label: label.into(),
            codesets: codesets.into(),
            categories: SmallVec::new(),
            lookback: Lookback::ZERO,
            period_adjusted: false,
            window_match: WindowMatch::Occurred,
            anchor: None,
            anchor_precision: AnchorPrecision::Instant,
            qualifier: None,
            remediation: None,
            narrative: DEFAULT_SATISFIED_NARRATIVE.to_string(),
        }
    }

    /// Search these categories; the first listed wins same-timestamp ties last
    pub fn in_categories(mut self, categories: impl IntoIterator<Item = EventCategory>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    pub fn lookback(mut self, lookback: Lookback) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn period_adjusted(mut self) -> Self {
        self.period_adjusted = true;
        self
    }

    /// Match events whose active interval overlaps the window
    pub fn intersecting(mut self) -> Self {
        self.window_match = WindowMatch::Intersecting;
        self
    }

    pub fn on_or_after(mut self, anchor: impl Into<RuleId>) -> Self {
        self.anchor = Some(anchor.into());
        self.anchor_precision = AnchorPrecision::Instant;
        self
    }

    /// Like [`on_or_after`](Self::on_or_after), but any time on the anchor's day counts
    pub fn on_or_after_day_of(mut self, anchor: impl Into<RuleId>) -> Self {
        self.anchor = Some(anchor.into());
        self.anchor_precision = AnchorPrecision::Day;
        self
    }

    pub fn qualified_by(mut self, qualifier: impl Into<CodesetRef>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn remediate(mut self, remediation: Remediation) -> Self {
        self.remediation = Some(remediation);
        self
    }

    pub fn narrative(mut self, template: impl Into<String>) -> Self {
        self.narrative = template.into();
        self
    }

    /// Whether this rule searches exactly the reporting timeframe
    pub fn uses_period(&self, period_adjustment: bool) -> bool {
        self.period_adjusted || period_adjustment || self.lookback.is_zero()
    }

    /// Window searched for this rule, before any anchor is applied.
    ///
    /// The end is always the reporting-period end; a lookback only ever widens
    /// the window below the reporting period.
    pub fn effective_window(&self, timeframe: &Timeframe, period_adjustment: bool) -> Timeframe {
        if self.uses_period(period_adjustment) {
            *timeframe
        } else {
            timeframe.extended_back(self.lookback)
        }
    }

    /// Instant evidence matched at `occurred` stops being valid
    pub fn expires_at(
        &self,
        occurred: DateTime<Utc>,
        timeframe: &Timeframe,
        period_adjustment: bool,
    ) -> DateTime<Utc> {
        if self.uses_period(period_adjustment) {
            occurred
                .checked_add_signed(timeframe.duration())
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        } else {
            self.lookback.after(occurred)
        }
    }
}

/// A rule that produced a qualifying event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceMatch {
    pub rule_id: RuleId,
    pub label: String,
    pub event: ClinicalEvent,
    pub window: Timeframe,
    pub expires_at: DateTime<Utc>,
}

impl EvidenceMatch {
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.event.timestamp
    }

    /// Whole days from `now` until the evidence expires
    pub fn due_in(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_days()
    }
}

/// Cascading, short-circuiting search over evidence rules
pub struct EvidenceResolver;

impl EvidenceResolver {
    /// Return the match of the first rule, in order, that yields evidence.
    ///
    /// Rules after the first match are never searched.
    pub fn resolve(ctx: &mut EvaluationContext<'_>, rules: &[RuleId]) -> EvalResult<Option<EvidenceMatch>> {
        for id in rules {
            if let Some(found) = Self::resolve_rule(ctx, id)? {
                log::debug!("Evidence rule '{}' matched event {}", id, found.event.id);
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Resolve a single rule, consulting and filling the context's memo cache
    pub fn resolve_rule(ctx: &mut EvaluationContext<'_>, id: &RuleId) -> EvalResult<Option<EvidenceMatch>> {
        if let Some(outcome) = ctx.memoized(id) {
            return Ok(outcome.clone());
        }
        let rule = ctx.rule(id).ok_or_else(|| EvalError::unknown_rule(id.as_str()))?;
        if !ctx.enter(id) {
            return Err(EvalError::internal(format!(
                "evidence rule '{}' is anchored on itself",
                id
            )));
        }
        let outcome = Self::search(ctx, rule);
        ctx.leave(id);
        let outcome = outcome?;
        ctx.memoize(id.clone(), outcome.clone());
        Ok(outcome)
    }

    fn search(ctx: &mut EvaluationContext<'_>, rule: &EvidenceRule) -> EvalResult<Option<EvidenceMatch>> {
        let timeframe = ctx.timeframe();
        let period_adjustment = ctx.options().period_adjustment;
        let mut window = rule.effective_window(&timeframe, period_adjustment);

        let mut not_before = None;
        if let Some(anchor) = &rule.anchor {
            let Some(anchor_match) = Self::resolve_rule(ctx, anchor)? else {
                log::trace!("Rule '{}' skipped: anchor '{}' has no evidence", rule.id, anchor);
                return Ok(None);
            };
            let anchored_at = rule.anchor_precision.not_before(anchor_match.occurred_at());
            match window.starting_no_earlier_than(anchored_at) {
                Some(narrowed) => window = narrowed,
                None => return Ok(None),
            }
            not_before = Some(anchored_at);
        }

        log::trace!(
            "Searching rule '{}' ({}) in {:?} within {}",
            rule.id,
            rule.codesets,
            rule.categories,
            window
        );
        let latest = ctx
            .find(&rule.codesets, &rule.categories)
            .matching(window, rule.window_match)
            .iter()
            .filter(|event| not_before.is_none_or(|anchor| event.timestamp >= anchor))
            .max_by_key(|event| event.timestamp);

        let Some(event) = latest else {
            return Ok(None);
        };
        if let Some(qualifier) = &rule.qualifier {
            if !ctx.matcher().belongs_to_any(event, qualifier) {
                log::trace!("Rule '{}': latest event {} lacks qualifier {}", rule.id, event.id, qualifier);
                return Ok(None);
            }
        }

        Ok(Some(EvidenceMatch {
            rule_id: rule.id.clone(),
            label: rule.label.clone(),
            event: event.clone(),
            window,
            expires_at: rule.expires_at(event.timestamp, &timeframe, period_adjustment),
        }))
    }
}
