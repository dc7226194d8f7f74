//! Validate command implementation

use super::{load_catalog, output};
use anyhow::{Context, Result};
use colored::Colorize;
use octofhir_cqm_diagnostics::{CQM0302, Diagnostic, Severity};
use octofhir_cqm_eval::MeasureDefinition;
use octofhir_cqm_measures::all_measures;
use octofhir_cqm_model::CodesetCatalog;
use std::path::PathBuf;

/// Configuration for validate command
#[derive(Debug, Clone, Default)]
pub struct ValidateConfig {
    /// Codeset catalog merged over the bundled one
    pub catalog: Option<PathBuf>,
    /// Measures to check; all bundled measures when empty
    pub measures: Vec<String>,
    /// Treat warnings as errors
    pub strict: bool,
    pub verbose: bool,
}

/// Validation result for a single measure
#[derive(Debug, Clone)]
pub struct MeasureValidation {
    pub measure: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl MeasureValidation {
    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }
}

/// Check the selected measures against the catalog
pub fn validate_measures(config: &ValidateConfig) -> Result<Vec<MeasureValidation>> {
    let catalog = load_catalog(config.catalog.as_deref())?;
    let definitions = all_measures().context("Failed to build the bundled measures")?;

    if let Some(unknown) = config
        .measures
        .iter()
        .find(|id| !definitions.iter().any(|d| d.id() == id.as_str()))
    {
        anyhow::bail!("Unknown measure '{}'", unknown);
    }

    Ok(definitions
        .iter()
        .filter(|d| config.measures.is_empty() || config.measures.iter().any(|id| id == d.id()))
        .map(|definition| validate_measure(definition, &catalog, config.verbose))
        .collect())
}

fn validate_measure(definition: &MeasureDefinition, catalog: &CodesetCatalog, verbose: bool) -> MeasureValidation {
    if verbose {
        eprintln!("Validating: {}", definition.id());
    }
    let mut diagnostics = Vec::new();
    if let Err(err) = definition.validate(catalog) {
        diagnostics.push(err.to_diagnostic());
    }

    for name in referenced_codesets(definition) {
        if catalog.get(&name).is_some_and(|entry| entry.codes.is_empty()) {
            diagnostics.push(
                Diagnostic::warning(CQM0302, format!("Codeset '{}' lists no codes", name))
                    .with_subject(format!("{}/{}", definition.id(), name)),
            );
        }
    }
    MeasureValidation {
        measure: definition.id().to_string(),
        diagnostics,
    }
}

/// Every codeset name a measure refers to, without duplicates
fn referenced_codesets(definition: &MeasureDefinition) -> Vec<String> {
    let rule_codesets = definition
        .rules
        .values()
        .flat_map(|rule| std::iter::once(&rule.codesets).chain(rule.qualifier.as_ref()));
    let predicate_codesets = definition
        .initial
        .codesets()
        .into_iter()
        .chain(definition.criteria().flat_map(|c| c.predicate.codesets()));

    let mut names: Vec<String> = Vec::new();
    for name in rule_codesets.chain(predicate_codesets).flat_map(|c| c.iter()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Validate the bundled measures and print a report
pub fn validate(config: ValidateConfig) -> Result<()> {
    let results = validate_measures(&config)?;

    let mut total_errors = 0;
    let mut total_warnings = 0;
    for result in &results {
        total_errors += result.errors();
        total_warnings += result.warnings();
        print_validation_result(result, config.verbose);
    }

    println!();
    if total_errors == 0 && (total_warnings == 0 || !config.strict) {
        let mut message = format!("All {} measure(s) validated successfully", results.len());
        if total_warnings > 0 {
            message.push_str(&format!(" ({} warning(s))", total_warnings));
        }
        println!("{}", output::format_success(&message));
        return Ok(());
    }

    let mut summary = Vec::new();
    if total_errors > 0 {
        summary.push(format!("{} error(s)", total_errors).red().to_string());
    }
    if total_warnings > 0 {
        summary.push(format!("{} warning(s)", total_warnings).yellow().to_string());
    }
    if config.strict && total_errors == 0 {
        eprintln!("{}", "Strict mode: treating warnings as errors".yellow());
    }
    anyhow::bail!("Validation failed: found {}", summary.join(", "))
}

/// Print validation result for a measure; warnings only when verbose
fn print_validation_result(result: &MeasureValidation, verbose: bool) {
    let status = if result.errors() == 0 {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("{} {}", status, result.measure.cyan());

    for diagnostic in &result.diagnostics {
        if diagnostic.severity == Severity::Error || verbose {
            println!("  {}", diagnostic.to_colored_string().replace('\n', "\n  "));
        }
    }
    if !verbose && result.warnings() > 0 {
        println!("  {} warning(s), use --verbose to list them", result.warnings());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_cqm_measures::cms130v6;

    #[test]
    fn test_referenced_codesets_are_unique_and_ordered() {
        let names = referenced_codesets(&cms130v6().unwrap());
        assert_eq!(names.first().map(String::as_str), Some("FecalOccultBloodTestFobt"));
        assert!(names.iter().any(|n| n == "TotalColectomy"));
        assert!(names.iter().any(|n| n == "OfficeVisit"));
        let mut deduped = names.clone();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
    }
}
