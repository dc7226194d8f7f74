//! Output formatting utilities

use anyhow::{Context, Result};
use colored::Colorize;
use octofhir_cqm_types::MeasureStatus;
use serde::Serialize;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::str::FromStr;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    JsonPretty,
    Table,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "json-pretty" => Ok(Self::JsonPretty),
            "table" => Ok(Self::Table),
            other => anyhow::bail!("Unknown output format '{}'. Expected json, pretty or table", other),
        }
    }
}

impl OutputFormat {
    /// Parse an optional `--format` value, defaulting to pretty JSON
    pub fn parse_or_default(value: Option<&str>) -> Result<Self> {
        value.map_or(Ok(Self::default()), Self::from_str)
    }
}

/// Set up color output based on user preference
pub fn setup_colors(mode: &str) {
    match mode.to_lowercase().as_str() {
        "always" => colored::control::set_override(true),
        "never" => colored::control::set_override(false),
        _ => colored::control::set_override(io::stdout().is_terminal()),
    }
}

/// Format an error for display
pub fn format_error(error: &anyhow::Error) -> String {
    format!("{} {:#}", "Error:".red().bold(), error)
}

/// Format a success message for display
pub fn format_success(message: &str) -> String {
    format!("{} {}", "Success:".green().bold(), message)
}

/// Colored status label for tables
pub fn format_status(status: MeasureStatus) -> String {
    let label = status.to_string();
    match status {
        MeasureStatus::Due => label.yellow().bold().to_string(),
        MeasureStatus::Satisfied => label.green().to_string(),
        MeasureStatus::NotApplicable => label.dimmed().to_string(),
    }
}

/// Write output to a file or stdout
pub fn write_output(content: &str, output_file: Option<&Path>) -> Result<()> {
    if let Some(path) = output_file {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write to output file: {}", path.display()))?;
        eprintln!("{}", format_success(&format!("Output written to {}", path.display())));
    } else {
        println!("{}", content);
    }
    Ok(())
}

/// Serialize a value as compact or pretty JSON
pub fn format_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(value).context("Failed to serialize JSON")
    } else {
        serde_json::to_string(value).context("Failed to serialize JSON")
    }
}

/// Render rows as a table in the tool's style
pub fn format_table<R: tabled::Tabled>(rows: impl IntoIterator<Item = R>) -> String {
    tabled::Table::new(rows)
        .with(tabled::settings::Style::modern())
        .to_string()
}
