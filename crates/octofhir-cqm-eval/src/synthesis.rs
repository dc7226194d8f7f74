//! Result synthesis
//!
//! Turns the classifier's final verdicts into a [`MeasureResult`]: a status,
//! a due-in figure, narrative lines and ranked recommendations. The state of
//! the reporting population decides the status.

use crate::context::EvaluationContext;
use crate::definition::MeasureDefinition;
use crate::error::{EvalError, EvalResult};
use crate::evidence::{DEFAULT_SATISFIED_NARRATIVE, EvidenceMatch, EvidenceRule};
use crate::population::{Classification, NumeratorCriteria, PopulationDefinition};
use crate::predicate::Verdict;
use chrono::{DateTime, Utc};
use octofhir_cqm_types::{MeasureResult, MeasureStatus, PopulationState, Recommendation};

/// Due-in value of a patient who is due right now
pub const DUE_NOW: i64 = -1;

const NO_HISTORY: &str = "No relevant exams found.";

pub struct ResultSynthesizer;

impl ResultSynthesizer {
    pub fn synthesize(
        definition: &MeasureDefinition,
        classification: &Classification,
        ctx: &mut EvaluationContext<'_>,
    ) -> EvalResult<MeasureResult> {
        let reporting = definition
            .reporting_population()
            .ok_or_else(|| EvalError::unknown_population(definition.reporting.as_str()))?;
        let population = classification.get(&reporting.id)?;

        let mut result = match population.state() {
            PopulationState::NotInInitial => Self::not_in_initial(definition, classification, ctx)?,
            PopulationState::ExcludedFromDenominator => {
                let mut result = MeasureResult::new(MeasureStatus::NotApplicable);
                let reason = population.reason().unwrap_or("not eligible");
                result.add_narrative(format!("{} is excluded: {}.", ctx.patient().display_name(), reason));
                result
            }
            PopulationState::InNumerator => Self::satisfied(definition, classification, reporting, ctx),
            PopulationState::NotInNumerator => Self::due(definition, classification, reporting, ctx)?,
            state => {
                return Err(EvalError::internal(format!(
                    "population '{}' left classification in non-final state {}",
                    reporting.id, state
                )));
            }
        };

        result.populations = classification
            .populations
            .iter()
            .map(|(id, p)| (id.to_string(), p.state()))
            .collect();
        log::debug!(
            "Measure {}: patient {} is {:?} (due in {:?})",
            definition.id(),
            ctx.patient().id,
            result.status,
            result.due_in
        );
        Ok(result)
    }

    fn not_in_initial(
        definition: &MeasureDefinition,
        classification: &Classification,
        ctx: &mut EvaluationContext<'_>,
    ) -> EvalResult<MeasureResult> {
        let mut result = MeasureResult::new(MeasureStatus::NotApplicable);
        if let Verdict::Indeterminate(reason) = &classification.initial {
            result.add_narrative(format!(
                "{}: eligibility could not be determined ({}).",
                ctx.patient().display_name(),
                reason
            ));
            return Ok(result);
        }

        for exclusion in &definition.exclusions {
            if exclusion.predicate.evaluate(ctx)?.is_met() {
                log::debug!("No first-due date: measure exclusion '{}' applies", exclusion.id);
                return Ok(result);
            }
        }
        let first_due = definition.initial.days_until_eligible(ctx)?.filter(|days| *days > 0);
        Ok(result.with_due_in(first_due))
    }

    fn satisfied(
        definition: &MeasureDefinition,
        classification: &Classification,
        reporting: &PopulationDefinition,
        ctx: &EvaluationContext<'_>,
    ) -> MeasureResult {
        let cited: Vec<&EvidenceMatch> = match &reporting.numerator {
            NumeratorCriteria::Evidence(_) => classification
                .populations
                .get(&reporting.id)
                .and_then(|p| p.evidence())
                .into_iter()
                .collect(),
            NumeratorCriteria::AllApplicable(dependencies) => dependencies
                .iter()
                .filter_map(|id| classification.populations.get(id))
                .filter(|p| p.state() == PopulationState::InNumerator)
                .filter_map(|p| p.evidence())
                .collect(),
        };

        let now = ctx.now();
        let mut result = MeasureResult::new(MeasureStatus::Satisfied)
            .with_due_in(cited.iter().map(|evidence| evidence.due_in(now)).min());
        for evidence in cited {
            let template = definition
                .rule(&evidence.rule_id)
                .map(|rule| rule.narrative.as_str())
                .unwrap_or(DEFAULT_SATISFIED_NARRATIVE);
            let name = ctx.patient().display_name();
            result.add_narrative(render(template, name, &evidence.label, evidence.occurred_at()));
        }
        result
    }

    fn due(
        definition: &MeasureDefinition,
        classification: &Classification,
        reporting: &PopulationDefinition,
        ctx: &EvaluationContext<'_>,
    ) -> EvalResult<MeasureResult> {
        let gap = Self::gap_population(definition, classification, reporting)?;
        let name = ctx.patient().display_name();
        let mut result = MeasureResult::new(MeasureStatus::Due).with_due_in(Some(DUE_NOW));

        result.add_narrative(gap.due.headline.replace("{name}", name));
        if gap.due.cite_history {
            result.add_narrative(Self::history_line(definition, gap, ctx));
        }
        if gap.due.cite_interval {
            if let Some(interval) = definition.screening_interval {
                result.add_narrative(format!("Current screening interval {}.", interval));
            }
        }

        let remediations = gap
            .evidence_rules()
            .iter()
            .filter_map(|id| definition.rule(id))
            .filter_map(|rule| rule.remediation.as_ref());
        for (rank, remediation) in (1u32..).zip(remediations) {
            result.add_recommendation(Recommendation {
                rank,
                key: remediation.key.clone(),
                kind: remediation.kind,
                title: remediation.title.clone(),
                context: remediation.context.clone(),
            });
        }
        Ok(result)
    }

    /// The evidence population whose missing evidence makes the patient due
    fn gap_population<'d>(
        definition: &'d MeasureDefinition,
        classification: &Classification,
        reporting: &'d PopulationDefinition,
    ) -> EvalResult<&'d PopulationDefinition> {
        let NumeratorCriteria::AllApplicable(dependencies) = &reporting.numerator else {
            return Ok(reporting);
        };
        for dependency in dependencies {
            let state = classification.get(dependency)?.state();
            if state.in_denominator() && state != PopulationState::InNumerator {
                return definition
                    .population(dependency)
                    .ok_or_else(|| EvalError::unknown_population(dependency.as_str()));
            }
        }
        Err(EvalError::internal(format!(
            "composite population '{}' is due without a failing dependency",
            reporting.id
        )))
    }

    /// Latest event on record for the most definitive rule that has one, ignoring windows
    fn history_line(definition: &MeasureDefinition, gap: &PopulationDefinition, ctx: &EvaluationContext<'_>) -> String {
        let latest = gap
            .evidence_rules()
            .iter()
            .rev()
            .filter_map(|id| definition.rule(id))
            .find_map(|rule| latest_on_record(rule, ctx).map(|at| (rule, at)));
        match latest {
            Some((rule, at)) => format!("Last {} done on {}.", rule.label, at.format("%Y-%m-%d")),
            None => NO_HISTORY.to_string(),
        }
    }
}

fn latest_on_record(rule: &EvidenceRule, ctx: &EvaluationContext<'_>) -> Option<DateTime<Utc>> {
    ctx.find(&rule.codesets, &rule.categories)
        .iter()
        .map(|event| event.timestamp)
        .max()
}

/// Fill a narrative template's `{name}`, `{label}` and `{date}` placeholders
pub fn render(template: &str, name: &str, label: &str, date: DateTime<Utc>) -> String {
    template
        .replace("{name}", name)
        .replace("{label}", label)
        .replace("{date}", &date.format("on %Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_render_template() {
        let date = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            render(DEFAULT_SATISFIED_NARRATIVE, "Jane", "Colonoscopy", date),
            "Jane had a Colonoscopy on 2021-06-01."
        );
        assert_eq!(
            render("{name} had a Tobacco screening {date} and is not a smoker.", "Sam", "", date),
            "Sam had a Tobacco screening on 2021-06-01 and is not a smoker."
        );
    }
}
