// crates/apiforge-cli/src/main.rs
// ============================================================================
// Module: apiforge CLI Entry Point
// Description: Command dispatcher for validation, expansion, generation, and runs.
// Purpose: Drive the apiforge pipeline from definition files.
// Dependencies: apiforge-codegen, apiforge-config, apiforge-core, apiforge-harness, clap
// ============================================================================

//! ## Overview
//! `apiforge` validates definition files, prints the expanded test matrix,
//! emits artifacts (or checks them for drift), runs a definition's matrix
//! against a live endpoint, and scaffolds definitions from issue metadata.
//! Results go to stdout, diagnostics to stderr; any rejected definition,
//! drift, or failing case yields a failure exit code.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use apiforge_codegen::DefinitionStatus;
use apiforge_codegen::OutputMode;
use apiforge_codegen::generate;
use apiforge_config::ApiforgeConfig;
use apiforge_core::ApiDefinition;
use apiforge_core::DefinitionLoad;
use apiforge_core::GeneratedCase;
use apiforge_core::IssueMetadata;
use apiforge_core::expand;
use apiforge_core::load_definitions;
use apiforge_core::read_definitions;
use apiforge_core::scaffold_definition;
use apiforge_harness::Harness;
use apiforge_http::HttpTransportConfig;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "apiforge", version, disable_help_subcommand = true)]
struct Cli {
    /// Configuration file (overrides `APIFORGE_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate definitions and list every violation.
    Validate(InputArgs),
    /// Print the expanded test matrix as JSON.
    Expand(ExpandCommand),
    /// Emit model, client, and test artifacts.
    Generate(GenerateCommand),
    /// Execute a definition's matrix against a live endpoint.
    Run(RunCommand),
    /// Create a definition skeleton from issue metadata.
    Scaffold(ScaffoldCommand),
}

/// Definition input selection.
#[derive(Args, Debug)]
struct InputArgs {
    /// Definition file (defaults to `generation.input`).
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,
}

/// Arguments for `expand`.
#[derive(Args, Debug)]
struct ExpandCommand {
    /// Input selection.
    #[command(flatten)]
    input: InputArgs,
    /// Only expand the named definition.
    #[arg(long, value_name = "NAME")]
    page: Option<String>,
}

/// Arguments for `generate`.
#[derive(Args, Debug)]
struct GenerateCommand {
    /// Input selection.
    #[command(flatten)]
    input: InputArgs,
    /// Artifact root (defaults to `generation.output_dir`).
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,
    /// Report drift instead of writing.
    #[arg(long)]
    check: bool,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Input selection.
    #[command(flatten)]
    input: InputArgs,
    /// Only run the named definition.
    #[arg(long, value_name = "NAME")]
    page: Option<String>,
    /// Base URL override.
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
}

/// Arguments for `scaffold`.
#[derive(Args, Debug)]
struct ScaffoldCommand {
    /// Issue metadata JSON file.
    #[arg(long, value_name = "PATH")]
    issue: PathBuf,
    /// Write the definition here instead of stdout.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
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

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate(input) => command_validate(cli.config.as_deref(), &input),
        Commands::Expand(command) => command_expand(cli.config.as_deref(), &command),
        Commands::Generate(command) => command_generate(cli.config.as_deref(), &command),
        Commands::Run(command) => command_run(cli.config.as_deref(), command),
        Commands::Scaffold(command) => command_scaffold(&command),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes `validate`.
fn command_validate(config: Option<&Path>, input: &InputArgs) -> CliResult<ExitCode> {
    let config = load_config(config)?;
    let load = load_input(&config, input)?;
    if report_rejections(&load)? {
        return Ok(ExitCode::FAILURE);
    }
    write_stdout_line(&format!("{} definition(s) valid", load.definitions.len()))?;
    Ok(ExitCode::SUCCESS)
}

/// Matrix entry printed by `expand`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExpandedDefinition<'a> {
    /// Definition name.
    page_name: &'a str,
    /// Base route.
    base_route: &'a str,
    /// Expanded cases in matrix order.
    cases: Vec<GeneratedCase>,
}

/// Executes `expand`.
fn command_expand(config: Option<&Path>, command: &ExpandCommand) -> CliResult<ExitCode> {
    let config = load_config(config)?;
    let load = load_input(&config, &command.input)?;
    if report_rejections(&load)? {
        return Ok(ExitCode::FAILURE);
    }
    let selected = select_definitions(&load.definitions, command.page.as_deref())?;
    let expanded: Vec<ExpandedDefinition<'_>> = selected
        .into_iter()
        .map(|definition| ExpandedDefinition {
            page_name: &definition.page_name,
            base_route: &definition.base_route,
            cases: expand(definition),
        })
        .collect();
    let json = serde_json::to_string_pretty(&expanded)
        .map_err(|err| CliError::new(format!("failed to encode matrix: {err}")))?;
    write_stdout_line(&json)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `generate`.
fn command_generate(config: Option<&Path>, command: &GenerateCommand) -> CliResult<ExitCode> {
    let config = load_config(config)?;
    let load = load_input(&config, &command.input)?;
    let root = command.output.clone().unwrap_or_else(|| config.generation.output_dir.clone());
    let mode = if command.check { OutputMode::Check } else { OutputMode::Write };
    let sink = config.event_sink().map_err(|err| CliError::new(err.to_string()))?;
    let report = generate(&load, &root, mode, sink.as_ref())
        .map_err(|err| CliError::new(format!("generation failed: {err}")))?;

    for outcome in &report.outcomes {
        let name = outcome.page_name.as_deref().unwrap_or("<unnamed>");
        match &outcome.status {
            DefinitionStatus::Emitted(paths) => {
                for path in paths {
                    write_stdout_line(&format!("wrote {}", path.display()))?;
                }
            }
            DefinitionStatus::Unchanged => write_stdout_line(&format!("{name}: up to date"))?,
            DefinitionStatus::Drift(paths) => {
                for path in paths {
                    write_stderr_line(&format!("drift detected for {}", path.display()))?;
                }
            }
            DefinitionStatus::Rejected(_) => {}
        }
    }
    let violations = report.violations();
    if !violations.is_empty() {
        write_stderr_line(&format!("schema validation failed: {} violation(s)", violations.len()))?;
        for violation in violations {
            write_stderr_line(&format!("  - {violation}"))?;
        }
    }
    Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Executes `run`.
fn command_run(config: Option<&Path>, command: RunCommand) -> CliResult<ExitCode> {
    let mut config = load_config(config)?;
    if let Some(base_url) = command.base_url {
        match config.http.as_mut() {
            Some(http) => http.base_url = base_url,
            None => config.http = Some(HttpTransportConfig::new(base_url)),
        }
    }
    let load = load_input(&config, &command.input)?;
    if report_rejections(&load)? {
        return Ok(ExitCode::FAILURE);
    }
    let selected = select_definitions(&load.definitions, command.page.as_deref())?;
    let harness = Harness::from_config(&config).map_err(|err| CliError::new(err.to_string()))?;

    let (mut passed, mut failed) = (0_usize, 0_usize);
    for definition in selected {
        let summary = harness.run_definition(definition);
        for outcome in &summary.outcomes {
            match &outcome.result {
                Ok(report) if report.is_ok() => {
                    let line = format!("PASS {}::{}", summary.page_name, outcome.test_name);
                    write_stdout_line(&line)?;
                }
                Ok(report) => {
                    write_stdout_line(&format!(
                        "FAIL {}::{} ({})\n  {}",
                        summary.page_name,
                        outcome.test_name,
                        outcome.variant,
                        report.result.to_string().replace('\n', "\n  ")
                    ))?;
                }
                Err(err) => {
                    let line = format!("ERROR {}::{}", summary.page_name, outcome.test_name);
                    write_stdout_line(&line)?;
                    write_stderr_line(&err.to_string())?;
                }
            }
        }
        passed += summary.passed();
        failed += summary.failed();
    }
    write_stdout_line(&format!("{passed} passed, {failed} failed"))?;
    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Executes `scaffold`.
fn command_scaffold(command: &ScaffoldCommand) -> CliResult<ExitCode> {
    let issue = IssueMetadata::read(&command.issue).map_err(|err| CliError::new(err.to_string()))?;
    let definition = scaffold_definition(&issue);
    let mut json = serde_json::to_string_pretty(&definition)
        .map_err(|err| CliError::new(format!("failed to encode definition: {err}")))?;
    json.push('\n');
    match &command.output {
        Some(path) => {
            if path.exists() {
                return Err(CliError::new(format!(
                    "refusing to overwrite existing file {}",
                    path.display()
                )));
            }
            fs::write(path, json)
                .map_err(|err| CliError::new(format!("{}: {err}", path.display())))?;
            write_stdout_line(&format!("wrote {}", path.display()))?;
        }
        None => write_stdout_bytes(json.as_bytes())?,
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Loads configuration, mapping errors for display.
fn load_config(path: Option<&Path>) -> CliResult<ApiforgeConfig> {
    ApiforgeConfig::load(path).map_err(|err| CliError::new(err.to_string()))
}

/// Reads and loads the selected definition file.
fn load_input(config: &ApiforgeConfig, input: &InputArgs) -> CliResult<DefinitionLoad> {
    let path = input.input.as_deref().unwrap_or(config.generation.input.as_path());
    let raw = read_definitions(path).map_err(|err| CliError::new(err.to_string()))?;
    load_definitions(&raw).map_err(|err| CliError::new(err.to_string()))
}

/// Prints every rejection to stderr; returns true when any were found.
fn report_rejections(load: &DefinitionLoad) -> CliResult<bool> {
    let violations: Vec<String> = load
        .rejected
        .iter()
        .flat_map(|rejected| rejected.violations.iter().map(ToString::to_string))
        .collect();
    if violations.is_empty() {
        return Ok(false);
    }
    write_stderr_line(&format!("schema validation failed: {} violation(s)", violations.len()))?;
    for violation in violations {
        write_stderr_line(&format!("  - {violation}"))?;
    }
    Ok(true)
}

/// Selects definitions by page name.
fn select_definitions<'a>(
    definitions: &'a [ApiDefinition],
    page: Option<&str>,
) -> CliResult<Vec<&'a ApiDefinition>> {
    let Some(page) = page else {
        return Ok(definitions.iter().collect());
    };
    let selected: Vec<&ApiDefinition> =
        definitions.iter().filter(|definition| definition.page_name == page).collect();
    if selected.is_empty() {
        return Err(CliError::new(format!("no definition named `{page}`")));
    }
    Ok(selected)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| output_error("stdout", &err))
}

/// Writes raw bytes to stdout.
fn write_stdout_bytes(bytes: &[u8]) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes).map_err(|err| output_error("stdout", &err))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}").map_err(|err| output_error("stderr", &err))
}

/// Formats an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> CliError {
    CliError::new(format!("failed to write to {stream}: {error}"))
}

/// Prints an error and returns the failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(&format!("error: {message}"));
    ExitCode::FAILURE
}
