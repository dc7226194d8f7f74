//! CQM command-line interface

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use octofhir_cqm::EvaluationMode;
use octofhir_cqm::cli::{evaluate, list, output, validate};
use std::path::PathBuf;

/// CQM command-line tool
#[derive(Parser)]
#[command(name = "cqm")]
#[command(author, version, about = "Clinical quality measure evaluation tools", long_about = None)]
struct Cli {
    /// Verbose output (debug logging unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (json, pretty, table)
    #[arg(short = 'f', long, global = true)]
    format: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    color: String,

    /// Codeset catalog (JSON) merged over the bundled codesets
    #[arg(short, long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Point-of-care guidance; visit requirements are waived
    Guidance,
    /// Quality reporting
    Report,
}

impl From<Mode> for EvaluationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Guidance => EvaluationMode::Guidance,
            Mode::Report => EvaluationMode::Report,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a measure for a patient or a panel
    Evaluate {
        /// Measure identifier (e.g. CMS130v6)
        measure: String,

        /// Patient timeline document or array of documents (JSON)
        data: PathBuf,

        /// First day of the reporting period (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day of the reporting period, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Date due-in days are counted from (default: today)
        #[arg(long)]
        now: Option<NaiveDate>,

        /// Evaluation mode
        #[arg(short, long, value_enum, default_value_t = Mode::Guidance)]
        mode: Mode,

        /// Restrict every evidence window to the reporting period
        #[arg(long)]
        period_adjustment: bool,

        /// Append per-population counts and rates
        #[arg(short, long)]
        summary: bool,
    },

    /// Validate the bundled measures against the codeset catalog
    Validate {
        /// Measures to validate (default: all)
        measures: Vec<String>,

        /// Strict mode (warnings as errors)
        #[arg(short, long)]
        strict: bool,
    },

    /// List the bundled measures
    List,
}

fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    output::setup_colors(&cli.color);

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let result = match cli.command {
        Commands::Evaluate {
            measure,
            data,
            start,
            end,
            now,
            mode,
            period_adjustment,
            summary,
        } => {
            let config = evaluate::EvaluateConfig {
                measure,
                data,
                catalog: cli.catalog,
                start,
                end,
                now,
                mode: mode.into(),
                period_adjustment,
                summary,
                verbose: cli.verbose,
                output_format: cli.format,
                output_file: cli.output,
            };
            evaluate::evaluate(config)
        }

        Commands::Validate { measures, strict } => {
            let config = validate::ValidateConfig {
                catalog: cli.catalog,
                measures,
                strict,
                verbose: cli.verbose,
            };
            validate::validate(config)
        }

        Commands::List => {
            let config = list::ListConfig {
                catalog: cli.catalog,
                output_format: cli.format,
                output_file: cli.output,
            };
            list::list(config)
        }
    };

    if let Err(e) = result {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
