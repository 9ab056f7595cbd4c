// crates/consent-gate-cli/src/main.rs
// ============================================================================
// Module: Consent Gate CLI Entry Point
// Description: Command dispatcher for serving and inspecting Consent Gate.
// Purpose: Run the HTTP server, validate configuration, and report anomalies.
// Dependencies: clap, consent-gate-config, consent-gate-core, consent-gate-server, tokio
// ============================================================================

//! ## Overview
//! `consent-gate serve` runs the HTTP surface; `consent-gate config validate`
//! loads and validates configuration without opening a store; and
//! `consent-gate anomalies` runs the anomaly query once against the configured
//! store and prints JSON to stdout. Errors go to stderr with a failure exit
//! code.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use consent_gate_config::ConsentGateConfig;
use consent_gate_core::AnomalyRecord;
use consent_gate_core::UtcTimestamp;
use consent_gate_server::ConsentGateServer;
use consent_gate_server::build_service;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "consent-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Consent Gate HTTP server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Print undecided pending records older than the anomaly period.
    Anomalies(AnomaliesCommand),
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Config file path (defaults to `CONSENT_GATE_CONFIG` or `consent-gate.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate configuration.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `anomalies`.
#[derive(Args, Debug)]
struct AnomaliesCommand {
    /// Config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the configured anomaly period in milliseconds.
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    period_ms: Option<u64>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug)]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
        Commands::Anomalies(command) => command_anomalies(command).await,
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes `serve`.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config)?;
    let server = tokio::task::spawn_blocking(move || ConsentGateServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `config validate`.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = load_config(command.config.clone())?;
    write_stdout_line("ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `anomalies`.
async fn command_anomalies(command: AnomaliesCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config)?;
    let anomalies = tokio::task::spawn_blocking(move || list_anomalies(&config, command.period_ms))
        .await
        .map_err(|err| CliError::new(format!("anomaly query join failed: {err}")))??;
    let rendered = render_anomalies(&anomalies)?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration.
fn load_config(path: Option<PathBuf>) -> CliResult<ConsentGateConfig> {
    ConsentGateConfig::load(path.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Runs the anomaly query once against the configured store.
fn list_anomalies(
    config: &ConsentGateConfig,
    period_ms: Option<u64>,
) -> CliResult<Vec<AnomalyRecord>> {
    let service =
        build_service(config).map_err(|err| CliError::new(format!("store open failed: {err}")))?;
    let period =
        period_ms.map_or_else(|| config.reporting.anomaly_period(), Duration::from_millis);
    service
        .list_anomalies(UtcTimestamp::now(), period)
        .map_err(|err| CliError::new(format!("anomaly query failed: {err}")))
}

/// Renders anomalies as pretty JSON.
fn render_anomalies(anomalies: &[AnomalyRecord]) -> CliResult<String> {
    serde_json::to_string_pretty(anomalies)
        .map_err(|err| CliError::new(format!("anomaly serialization failed: {err}")))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
