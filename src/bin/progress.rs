//! Progress CLI - Command-line interface for the progress engine
//!
//! Commands:
//! - workouts: Personal records, exercise progress and workout insights
//! - measurements: Measurement statistics, trends, anomalies and insights
//! - trend: Trend of a single measurement type
//! - correlate: Correlation between two measurement types
//! - body-fat: Navy-method body fat estimate
//! - schema: Describe input formats and the configuration file

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use progress_engine::logging::LoggingConfig;
use progress_engine::pipeline::{parse_measurements, parse_workouts};
use progress_engine::types::TrendPeriod;
use progress_engine::{AnalyticsConfig, AnalyticsError, ProgressEngine, ENGINE_VERSION};

/// Progress - personal-record and body-measurement analytics
#[derive(Parser)]
#[command(name = "progress")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Analyze workout and body-measurement logs", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalOptions {
    /// Configuration file (JSON); see `progress schema config`
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reference time (RFC 3339); defaults to the current time
    #[arg(long, global = true)]
    now: Option<String>,

    /// Output format
    #[arg(long, global = true, default_value = "json-pretty")]
    output_format: OutputFormat,

    /// Output file path (use - for stdout)
    #[arg(short, long, global = true, default_value = "-")]
    output: PathBuf,

    /// Enable debug logging unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect personal records and summarize progress per exercise
    Workouts {
        /// Input file with a JSON array of workouts (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Analyze a measurement history
    Measurements {
        /// Input file with a JSON array of measurements (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Trend of one measurement type over a period
    Trend {
        /// Input file with a JSON array of measurements (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Measurement type, e.g. body_weight
        #[arg(short = 't', long = "type")]
        measurement_type: String,

        /// Look-back period
        #[arg(long, default_value = "month")]
        period: PeriodArg,
    },

    /// Pearson correlation between two measurement types
    Correlate {
        /// Input file with a JSON array of measurements (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// First measurement type
        #[arg(short = 'a', long)]
        type_a: String,

        /// Second measurement type
        #[arg(short = 'b', long)]
        type_b: String,
    },

    /// Navy-method body fat percentage from the latest circumferences
    BodyFat {
        /// Input file with a JSON array of measurements (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// male or female
        #[arg(short, long)]
        gender: String,
    },

    /// Print schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Compact JSON on one line
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum PeriodArg {
    Week,
    Month,
    Quarter,
    Year,
}

impl From<PeriodArg> for TrendPeriod {
    fn from(period: PeriodArg) -> Self {
        match period {
            PeriodArg::Week => TrendPeriod::Week,
            PeriodArg::Month => TrendPeriod::Month,
            PeriodArg::Quarter => TrendPeriod::Quarter,
            PeriodArg::Year => TrendPeriod::Year,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaType {
    /// Workout history input
    Workouts,
    /// Measurement history input
    Measurements,
    /// Configuration file with every default
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = LoggingConfig::from_env().verbose(cli.global.verbose).init() {
        eprintln!("warning: logging disabled: {e}");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ProgressCliError> {
    let global = cli.global;

    if let Commands::Schema { schema_type } = cli.command {
        return cmd_schema(schema_type, &global.output);
    }

    let engine = load_engine(global.config.as_deref())?;
    let now = reference_time(global.now.as_deref())?;
    debug!(%now, "reference time");

    match cli.command {
        Commands::Workouts { input } => {
            let workouts = parse_workouts(&read_input(&input)?)?;
            let report = engine.analyze_workouts(&workouts, now);
            info!(
                records = report.records.len(),
                exercises = report.progress.len(),
                "workout report ready"
            );
            write_output(&report, global.output_format, &global.output)
        }

        Commands::Measurements { input } => {
            let measurements = parse_measurements(&read_input(&input)?)?;
            let report = engine.analyze_measurements(&measurements, now)?;
            info!(
                measurements = report.stats.total_measurements,
                insights = report.insights.len(),
                "measurement report ready"
            );
            write_output(&report, global.output_format, &global.output)
        }

        Commands::Trend {
            input,
            measurement_type,
            period,
        } => {
            let measurements = parse_measurements(&read_input(&input)?)?;
            let trend = engine.trend(&measurements, &measurement_type, period.into(), now);
            write_output(&trend, global.output_format, &global.output)
        }

        Commands::Correlate {
            input,
            type_a,
            type_b,
        } => {
            let measurements = parse_measurements(&read_input(&input)?)?;
            let coefficient = engine.correlate(&measurements, &type_a, &type_b);
            let result = CorrelationOutput {
                type_a,
                type_b,
                coefficient,
            };
            write_output(&result, global.output_format, &global.output)
        }

        Commands::BodyFat { input, gender } => {
            let measurements = parse_measurements(&read_input(&input)?)?;
            let body_fat_percent = engine.body_fat(&measurements, &gender)?;
            let result = BodyFatOutput {
                gender: gender.trim().to_ascii_lowercase(),
                body_fat_percent,
            };
            write_output(&result, global.output_format, &global.output)
        }

        Commands::Schema { .. } => Ok(()),
    }
}

#[derive(Serialize)]
struct CorrelationOutput {
    type_a: String,
    type_b: String,
    coefficient: Option<f64>,
}

#[derive(Serialize)]
struct BodyFatOutput {
    gender: String,
    body_fat_percent: Option<f64>,
}

fn load_engine(config: Option<&Path>) -> Result<ProgressEngine, ProgressCliError> {
    let config = match config {
        Some(path) => {
            let config = AnalyticsConfig::from_json(&fs::read_to_string(path)?)?;
            debug!(path = %path.display(), "loaded configuration");
            config
        }
        None => AnalyticsConfig::default(),
    };
    Ok(ProgressEngine::with_config(config)?)
}

fn reference_time(now: Option<&str>) -> Result<DateTime<Utc>, ProgressCliError> {
    match now {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| ProgressCliError::InvalidTime(format!("{value}: {e}"))),
        None => Ok(Utc::now()),
    }
}

fn cmd_schema(schema_type: SchemaType, output: &Path) -> Result<(), ProgressCliError> {
    let text = match schema_type {
        SchemaType::Workouts => WORKOUTS_SCHEMA.to_string(),
        SchemaType::Measurements => MEASUREMENTS_SCHEMA.to_string(),
        SchemaType::Config => AnalyticsConfig::default().to_json()?,
    };
    write_text(&text, output)
}

const WORKOUTS_SCHEMA: &str = r#"Workout input: JSON array of completed workouts

[
  {
    "id": "workout id",
    "completed_at": "RFC 3339 timestamp (fallback for sets without one)",
    "exercises": [
      {
        "exercise_id": "stable exercise id",
        "exercise_name": "display name",
        "sets": [
          {
            "id": "optional set id",
            "weight": 100.0,
            "reps": 5,
            "duration_seconds": null,
            "distance_meters": null,
            "completed": true,
            "completed_at": "optional RFC 3339 timestamp"
          }
        ]
      }
    ]
  }
]

Only completed sets with a timestamp and either weight and reps, a duration
or a distance are analyzed."#;

const MEASUREMENTS_SCHEMA: &str = r#"Measurement input: JSON array of measurements

[
  { "type": "body_weight", "value": 80.0, "unit": "kg", "date": "2024-05-01T07:30:00Z" }
]

Well-known types: body_weight (kg, lb), height, waist, neck, hips (cm, m, mm, in),
body_fat. Any other type name is analyzed for trends, statistics and anomalies."#;

// Helper functions

fn read_input(input: &Path) -> Result<String, ProgressCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn format_output<T: Serialize>(
    value: &T,
    format: OutputFormat,
) -> Result<String, ProgressCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
    }
}

fn write_output<T: Serialize>(
    value: &T,
    format: OutputFormat,
    output: &Path,
) -> Result<(), ProgressCliError> {
    write_text(&format_output(value, format)?, output)
}

fn write_text(text: &str, output: &Path) -> Result<(), ProgressCliError> {
    if output.to_string_lossy() == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{text}")?;
        handle.flush()?;
    } else {
        fs::write(output, format!("{text}\n"))?;
    }
    Ok(())
}

// Error handling

#[derive(Debug)]
enum ProgressCliError {
    Io(io::Error),
    Engine(AnalyticsError),
    Json(serde_json::Error),
    InvalidTime(String),
}

impl From<io::Error> for ProgressCliError {
    fn from(e: io::Error) -> Self {
        ProgressCliError::Io(e)
    }
}

impl From<AnalyticsError> for ProgressCliError {
    fn from(e: AnalyticsError) -> Self {
        ProgressCliError::Engine(e)
    }
}

impl From<serde_json::Error> for ProgressCliError {
    fn from(e: serde_json::Error) -> Self {
        ProgressCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ProgressCliError> for CliError {
    fn from(e: ProgressCliError) -> Self {
        match e {
            ProgressCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ProgressCliError::Engine(e) => {
                let (code, hint) = match &e {
                    AnalyticsError::ParseError(_) | AnalyticsError::JsonError(_) => (
                        "PARSE_ERROR",
                        "Run 'progress schema workouts' or 'progress schema measurements'",
                    ),
                    AnalyticsError::UnsupportedGender(_) => {
                        ("INVALID_PARAMETER", "Use --gender male or --gender female")
                    }
                    AnalyticsError::InvalidParameter(_) | AnalyticsError::UnsupportedPeriod(_) => {
                        ("INVALID_PARAMETER", "Run 'progress schema config' for valid settings")
                    }
                    AnalyticsError::EncodingError(_) => ("ENCODING_ERROR", "Report this as a bug"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            ProgressCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ProgressCliError::InvalidTime(message) => CliError {
                code: "INVALID_TIME".to_string(),
                message,
                hint: Some("Pass --now as RFC 3339, e.g. 2024-05-31T18:00:00Z".to_string()),
            },
        }
    }
}
