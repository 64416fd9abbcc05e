//! HRV CLI - Command-line interface for HRV Flux
//!
//! Commands:
//! - process: Run sessions through the full pipeline
//! - validate: Run only the validator and report verdicts
//! - indexes: Print the index categories and their interpretations
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hrv_flux::encoder::SessionResponse;
use hrv_flux::types::{FilterMethod, RawSessionInput, SessionSummary};
use hrv_flux::{
    IndexCategory, PipelineConfig, RecordEncoder, SessionAdapter, SessionProcessor,
    SessionRecord, FLUX_VERSION, PRODUCER_NAME,
};

/// HRV Flux - Validate RR interval sessions and compute HRV metrics
#[derive(Parser)]
#[command(name = "hrv")]
#[command(author = "Synheart AI Inc")]
#[command(version = FLUX_VERSION)]
#[command(about = "Validate RR interval sessions and compute HRV metrics", long_about = None)]
struct Cli {
    /// Pipeline configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process sessions into records
    Process {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Statistical outlier filter (overrides the config file)
        #[arg(long)]
        filter_method: Option<FilterMethod>,

        /// Wrap each record in a response envelope
        #[arg(long, conflicts_with = "summary")]
        envelope: bool,

        /// Emit compact session summaries instead of full records
        #[arg(long)]
        summary: bool,
    },

    /// Validate sessions without computing metrics
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Statistical outlier filter (overrides the config file)
        #[arg(long)]
        filter_method: Option<FilterMethod>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print index categories, their metrics and interpretations
    Indexes {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Detect object, array or NDJSON
    Auto,
    /// Newline-delimited JSON (one session per line)
    Ndjson,
    /// JSON array of sessions
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

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

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), HrvCliError> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Process {
            input,
            output,
            input_format,
            output_format,
            filter_method,
            envelope,
            summary,
        } => {
            let config = load_config(config_path, filter_method)?;
            let mode = if envelope {
                RecordMode::Envelope
            } else if summary {
                RecordMode::Summary
            } else {
                RecordMode::Record
            };
            cmd_process(&input, &output, input_format, output_format, mode, config)
        }
        Commands::Validate {
            input,
            input_format,
            filter_method,
            json,
        } => {
            let config = load_config(config_path, filter_method)?;
            cmd_validate(&input, input_format, config, json)
        }
        Commands::Indexes { json } => cmd_indexes(json),
        Commands::Doctor { json } => cmd_doctor(config_path, json),
    }
}

/// Precedence: flag, then config file, then built-in defaults
fn load_config(
    path: Option<&Path>,
    filter_method: Option<FilterMethod>,
) -> Result<PipelineConfig, HrvCliError> {
    let mut config = match path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(method) = filter_method {
        config.validation.filter_method = method;
    }
    config.validate()?;
    Ok(config)
}

fn read_sessions(
    input: &Path,
    input_format: InputFormat,
) -> Result<Vec<RawSessionInput>, HrvCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(HrvCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let sessions = match input_format {
        InputFormat::Auto => SessionAdapter::parse_any(&input_data)?,
        InputFormat::Ndjson => SessionAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => SessionAdapter::parse_array(&input_data)?,
    };

    if sessions.is_empty() {
        return Err(HrvCliError::NoSessions);
    }
    Ok(sessions)
}

enum RecordMode {
    Record,
    Envelope,
    Summary,
}

fn cmd_process(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    mode: RecordMode,
    config: PipelineConfig,
) -> Result<(), HrvCliError> {
    let sessions = read_sessions(input, input_format)?;
    let processor = SessionProcessor::new(config);
    let encoder = RecordEncoder::new();

    let mut results: Vec<(&str, Result<SessionRecord, hrv_flux::ComputeError>)> = Vec::new();
    for session in &sessions {
        let result = processor.process(session).map(|(_, record)| record);
        results.push((session.recording_session_id.as_str(), result));
    }

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    let output_data = match mode {
        RecordMode::Record => {
            let records: Vec<&SessionRecord> =
                results.iter().filter_map(|(_, r)| r.as_ref().ok()).collect();
            format_output(&records, &output_format)?
        }
        RecordMode::Summary => {
            let summaries: Vec<SessionSummary> = results
                .iter()
                .filter_map(|(_, r)| r.as_ref().ok())
                .map(SessionSummary::from)
                .collect();
            format_output(&summaries, &output_format)?
        }
        RecordMode::Envelope => {
            let responses: Vec<SessionResponse<'_>> = results
                .iter()
                .map(|(id, r)| match r {
                    Ok(record) => encoder.encode(record),
                    Err(e) => encoder.encode_failure(id, e),
                })
                .collect();
            format_output(&responses, &output_format)?
        }
    };

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    info!(
        sessions = sessions.len(),
        failed,
        instance_id = encoder.instance_id(),
        "processing finished"
    );
    for (id, result) in &results {
        if let Err(e) = result {
            warn!(session = %id, error = %e, "session not processed");
        }
    }

    if failed > 0 {
        Err(HrvCliError::ProcessingFailed(failed))
    } else {
        Ok(())
    }
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    config: PipelineConfig,
    json: bool,
) -> Result<(), HrvCliError> {
    let sessions = read_sessions(input, input_format)?;
    let processor = SessionProcessor::new(config);

    let verdicts: Vec<SessionVerdict> = sessions
        .iter()
        .map(|session| {
            let outcome = processor.validator().validate(session);
            SessionVerdict {
                recording_session_id: session.recording_session_id.clone(),
                valid: outcome.result.valid,
                reason: outcome.result.reason.clone(),
                quality_score: outcome.result.quality_score,
                quality_label: outcome.result.quality_label.as_str(),
                outlier_count: outcome.result.outlier_count,
                valid_rr_percentage: outcome.result.valid_rr_percentage,
                cleaned_count: outcome.cleaned.len(),
            }
        })
        .collect();

    let invalid = verdicts.iter().filter(|v| !v.valid).count();
    let report = ValidationReport {
        filter_method: processor.validator().config().filter_method.as_str(),
        total_sessions: verdicts.len(),
        valid_sessions: verdicts.len() - invalid,
        invalid_sessions: invalid,
        sessions: verdicts,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Filter method:    {}", report.filter_method);
        println!("Total sessions:   {}", report.total_sessions);
        println!("Valid sessions:   {}", report.valid_sessions);
        println!("Invalid sessions: {}", report.invalid_sessions);
        println!();
        for v in &report.sessions {
            let status = if v.valid { "[VALID]" } else { "[INVALID]" };
            println!(
                "  {} {}: quality {:.3} ({}), {} outliers, {:.1}% in range",
                status,
                v.recording_session_id,
                v.quality_score,
                v.quality_label,
                v.outlier_count,
                v.valid_rr_percentage
            );
            if let Some(reason) = &v.reason {
                println!("      reason: {}", reason);
            }
        }
    }

    if report.invalid_sessions > 0 {
        Err(HrvCliError::ValidationFailed(report.invalid_sessions))
    } else {
        Ok(())
    }
}

fn cmd_indexes(json: bool) -> Result<(), HrvCliError> {
    let categories: Vec<CategoryInfo> = IndexCategory::ALL
        .iter()
        .map(|c| CategoryInfo {
            category: c.as_str(),
            metrics: c.metric_keys().iter().map(|k| k.as_str()).collect(),
            interpretation: c.interpretation(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
    } else {
        for info in &categories {
            println!("{}", info.category);
            println!("  metrics: {}", info.metrics.join(", "));
            println!("  {}", info.interpretation);
            println!();
        }
    }
    Ok(())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), HrvCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "flux_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("HRV Flux version {}", FLUX_VERSION),
    });

    match config_path {
        Some(path) if !path.exists() => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: format!("Config file {} does not exist", path.display()),
        }),
        Some(path) => match PipelineConfig::load(path) {
            Ok(config) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Config file valid (filter {}, resample {} Hz)",
                    config.validation.filter_method.as_str(),
                    config.spectral.resample_hz
                ),
            }),
            Err(e) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            }),
        },
        None => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using built-in defaults".to_string(),
        }),
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Warning,
            message: "stdin is a TTY (pass --input or pipe sessions)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for sessions)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("HRV Doctor Report");
        println!("=================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(HrvCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn format_output<T: Serialize>(items: &[T], format: &OutputFormat) -> Result<String, HrvCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for item in items {
                lines.push(serde_json::to_string(item)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(items)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(items)?),
    }
}

// Error handling

#[derive(Debug)]
enum HrvCliError {
    Io(io::Error),
    Compute(hrv_flux::ComputeError),
    Json(serde_json::Error),
    NoInput,
    NoSessions,
    ProcessingFailed(usize),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for HrvCliError {
    fn from(e: io::Error) -> Self {
        HrvCliError::Io(e)
    }
}

impl From<hrv_flux::ComputeError> for HrvCliError {
    fn from(e: hrv_flux::ComputeError) -> Self {
        HrvCliError::Compute(e)
    }
}

impl From<serde_json::Error> for HrvCliError {
    fn from(e: serde_json::Error) -> Self {
        HrvCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<HrvCliError> for CliError {
    fn from(e: HrvCliError) -> Self {
        match e {
            HrvCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            HrvCliError::Compute(e) => {
                let (code, hint) = match &e {
                    hrv_flux::ComputeError::ConfigError(_) => {
                        ("CONFIG_ERROR", "Run 'hrv doctor --config <file>' for details")
                    }
                    hrv_flux::ComputeError::Io(_) => {
                        ("IO_ERROR", "Check file paths and permissions")
                    }
                    _ => (
                        "PARSE_ERROR",
                        "Ensure input holds recordingSessionId, user_id, timestamp and rrIntervals",
                    ),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            HrvCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            HrvCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "No input: stdin is a terminal".to_string(),
                hint: Some("Pass --input <file> or pipe sessions on stdin".to_string()),
            },
            HrvCliError::NoSessions => CliError {
                code: "NO_SESSIONS".to_string(),
                message: "No sessions found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            HrvCliError::ProcessingFailed(count) => CliError {
                code: "PROCESSING_FAILED".to_string(),
                message: format!("{} sessions could not be processed", count),
                hint: Some("Set RUST_LOG=hrv_flux=warn to see the failing sessions".to_string()),
            },
            HrvCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} sessions failed validation", count),
                hint: Some("Inspect the reasons in the validation report".to_string()),
            },
            HrvCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    filter_method: &'static str,
    total_sessions: usize,
    valid_sessions: usize,
    invalid_sessions: usize,
    sessions: Vec<SessionVerdict>,
}

#[derive(Serialize)]
struct SessionVerdict {
    #[serde(rename = "recordingSessionId")]
    recording_session_id: String,
    valid: bool,
    reason: Option<String>,
    quality_score: f64,
    quality_label: &'static str,
    outlier_count: usize,
    valid_rr_percentage: f64,
    cleaned_count: usize,
}

#[derive(Serialize)]
struct CategoryInfo {
    category: &'static str,
    metrics: Vec<&'static str>,
    interpretation: &'static str,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
