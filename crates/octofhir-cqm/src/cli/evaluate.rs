//! Evaluate command implementation

use super::{load_catalog, output};
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use octofhir_cqm_eval::{
    EvaluationMode, EvaluationOptions, MeasureEngine, PanelSummary, PatientOutcome, evaluate_panel,
};
use octofhir_cqm_measures::standard_registry;
use octofhir_cqm_model::InMemoryTimeline;
use octofhir_cqm_types::Timeframe;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::Tabled;

/// Configuration for evaluate command
#[derive(Debug, Clone)]
pub struct EvaluateConfig {
    pub measure: String,
    /// Timeline document or panel (JSON)
    pub data: PathBuf,
    /// Codeset catalog merged over the bundled one
    pub catalog: Option<PathBuf>,
    /// First day of the reporting period (default: January 1st of the end year)
    pub start: Option<NaiveDate>,
    /// Last day of the reporting period, inclusive (default: December 31st of this year)
    pub end: Option<NaiveDate>,
    /// Date due-in days are counted from (default: today)
    pub now: Option<NaiveDate>,
    pub mode: EvaluationMode,
    pub period_adjustment: bool,
    pub summary: bool,
    pub verbose: bool,
    pub output_format: Option<String>,
    pub output_file: Option<PathBuf>,
}

/// Everything an evaluate run produces
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub measure: String,
    pub timeframe: Timeframe,
    pub outcomes: Vec<PatientOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PanelSummary>,
}

#[derive(Tabled)]
struct PatientRow {
    #[tabled(rename = "Patient")]
    patient: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Due in")]
    due_in: String,
    #[tabled(rename = "Narrative")]
    narrative: String,
    #[tabled(rename = "Recommendations")]
    recommendations: String,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Population")]
    population: String,
    #[tabled(rename = "Initial")]
    initial: usize,
    #[tabled(rename = "Denominator")]
    denominator: usize,
    #[tabled(rename = "Exclusions")]
    exclusions: usize,
    #[tabled(rename = "Numerator")]
    numerator: usize,
    #[tabled(rename = "Rate")]
    rate: String,
}

/// Evaluate a measure for every patient of a timeline file and print the results
pub fn evaluate(config: EvaluateConfig) -> Result<()> {
    let format = output::OutputFormat::parse_or_default(config.output_format.as_deref())?;
    let report = run_evaluation(&config)?;

    let content = match format {
        output::OutputFormat::Json => output::format_json(&report, false)?,
        output::OutputFormat::JsonPretty => output::format_json(&report, true)?,
        output::OutputFormat::Table => format_report_table(&report),
    };
    output::write_output(&content, config.output_file.as_deref())?;

    if config.verbose {
        eprintln!("{}", output::format_success("Evaluation completed"));
    }
    Ok(())
}

/// Load the inputs and evaluate the panel
pub fn run_evaluation(config: &EvaluateConfig) -> Result<EvaluationReport> {
    let catalog = Arc::new(load_catalog(config.catalog.as_deref())?);
    let registry = standard_registry(catalog.clone()).context("Failed to register the bundled measures")?;
    let definition = registry.get(&config.measure).with_context(|| {
        format!(
            "Unknown measure '{}'. Available measures: {}",
            config.measure,
            registry.ids().join(", ")
        )
    })?;

    let timelines = InMemoryTimeline::from_file(&config.data)
        .with_context(|| format!("Failed to load patient data: {}", config.data.display()))?;
    if config.verbose {
        eprintln!("Loaded {} patient(s) from {}", timelines.len(), config.data.display());
    }

    let timeframe = reporting_timeframe(config.start, config.end)?;
    let mut options = EvaluationOptions::new()
        .with_mode(config.mode)
        .with_period_adjustment(config.period_adjustment);
    if let Some(now) = config.now {
        options = options.with_now(start_of_day(now)?);
    }
    log::info!(
        "Evaluating {} over {} .. {} in {:?} mode",
        definition.id(),
        timeframe.start(),
        timeframe.end(),
        config.mode
    );

    let engine = MeasureEngine::new(catalog).with_options(options);
    let outcomes = evaluate_panel(&engine, &timelines, &timeframe, &definition)
        .with_context(|| format!("Failed to evaluate {}", definition.id()))?;
    let summary = config.summary.then(|| PanelSummary::from_outcomes(&outcomes));

    Ok(EvaluationReport {
        measure: definition.id().to_string(),
        timeframe,
        outcomes,
        summary,
    })
}

/// Reporting timeframe covering whole days from `start` through `end`
pub fn reporting_timeframe(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Timeframe> {
    let end = match end {
        Some(end) => end,
        None => NaiveDate::from_ymd_opt(Utc::now().year(), 12, 31).context("Invalid default end date")?,
    };
    let start = match start {
        Some(start) => start,
        None => NaiveDate::from_ymd_opt(end.year(), 1, 1).context("Invalid default start date")?,
    };
    let last_instant = end
        .and_hms_opt(23, 59, 59)
        .context("Invalid end date")?
        .and_utc();
    Timeframe::new(start_of_day(start)?, last_instant).context("Invalid reporting timeframe")
}

fn start_of_day(date: NaiveDate) -> Result<DateTime<Utc>> {
    Ok(date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("Invalid date {}", date))?
        .and_utc())
}

fn format_report_table(report: &EvaluationReport) -> String {
    let rows = report.outcomes.iter().map(|outcome| PatientRow {
        patient: outcome.patient_id.clone(),
        status: output::format_status(outcome.result.status),
        due_in: outcome
            .result
            .due_in
            .map_or_else(|| "-".to_string(), |days| days.to_string()),
        narrative: outcome.result.narrative.join("\n"),
        recommendations: outcome
            .result
            .recommendations
            .iter()
            .map(|r| format!("{}. {}", r.rank, r.title))
            .collect::<Vec<_>>()
            .join("\n"),
    });
    let mut content = format!("{}\n{}", report.measure, output::format_table(rows));

    if let Some(summary) = &report.summary {
        let rows = summary.populations.iter().map(|(id, counts)| SummaryRow {
            population: id.clone(),
            initial: counts.initial_population,
            denominator: counts.denominator,
            exclusions: counts.exclusions,
            numerator: counts.numerator,
            rate: counts
                .rate()
                .map_or_else(|| "-".to_string(), |rate| format!("{:.1}%", rate * 100.0)),
        });
        content.push_str(&format!(
            "\n\n{} patient(s): {} due, {} satisfied, {} not applicable\n{}",
            summary.patients,
            summary.due,
            summary.satisfied,
            summary.not_applicable,
            output::format_table(rows)
        ));
    }
    content
}
