// probtest-cli/src/main.rs
// ============================================================================
// Module: Probtest CLI Entry Point
// Description: Command dispatcher for feasibility dry-runs and baseline/spec
// store administration.
// Purpose: Give an operator a way to inspect stored artifacts and check a
// configuration's feasibility without wiring up a use case harness.
// Dependencies: clap, probtest-core, probtest-baseline, probtest-stats,
// serde_yaml, thiserror.
// ============================================================================

//! ## Overview
//! Running an experiment mode needs a concrete sample invoker, which only a
//! use case harness can supply, so this binary doesn't expose `measure`,
//! `explore`, or `optimize` directly; those are wired up by the harness
//! itself against `probtest-orchestrator`. What this binary covers is
//! everything that operates on stored artifacts and declared configuration
//! alone: feasibility dry-runs, and baseline/spec store inspection.

use std::collections::HashMap;
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use probtest_baseline::BaselineStore;
use probtest_baseline::SelectionError;
use probtest_baseline::SpecStore;
use probtest_baseline::StoreError;
use probtest_core::DeclaredConfig;
use probtest_core::config;
use probtest_core::error::ConfigError;
use probtest_core::verdict::feasibility_precheck;
use probtest_stats::FeasibilityReport;
use probtest_stats::StatsError;
use probtest_stats::feasibility_gate;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "probtest", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = clap::ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the feasibility gate for a declared configuration without
    /// executing any sample.
    DryRun(DryRunCommand),
    /// Baseline store utilities.
    Baseline {
        /// Selected baseline subcommand.
        #[command(subcommand)]
        command: BaselineCommand,
    },
    /// Execution-specification store utilities.
    Spec {
        /// Selected spec subcommand.
        #[command(subcommand)]
        command: SpecCommand,
    },
}

/// Configuration for the `dry-run` command.
#[derive(Args, Debug)]
struct DryRunCommand {
    /// Path to a YAML file deserializing to a declared configuration.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
    /// Name to attribute the feasibility verdict to, if infeasible.
    #[arg(long, value_name = "NAME", default_value = "dry-run")]
    test_name: String,
    /// Property override in `key=value` form, applied before environment
    /// overrides. May be repeated.
    #[arg(long = "property", value_name = "KEY=VALUE")]
    properties: Vec<String>,
    /// Prefix process-wide overrides are keyed under.
    #[arg(long, value_name = "PREFIX", default_value = "probtest")]
    prefix: String,
}

/// Baseline store subcommands.
#[derive(Subcommand, Debug)]
enum BaselineCommand {
    /// List every filename currently in the store.
    List(StoreDirCommand),
    /// Load a baseline and verify its content fingerprint.
    Verify(BaselineVerifyCommand),
}

/// Execution-specification store subcommands.
#[derive(Subcommand, Debug)]
enum SpecCommand {
    /// Load a specification and verify its content fingerprint.
    Verify(SpecVerifyCommand),
}

/// A store root directory argument shared by listing commands.
#[derive(Args, Debug)]
struct StoreDirCommand {
    /// Store root directory.
    #[arg(long, value_name = "DIR")]
    dir: PathBuf,
}

/// Configuration for `baseline verify`.
#[derive(Args, Debug)]
struct BaselineVerifyCommand {
    /// Baseline store root directory.
    #[arg(long, value_name = "DIR")]
    dir: PathBuf,
    /// Baseline filename within the store.
    #[arg(long, value_name = "FILENAME")]
    file: String,
}

/// Configuration for `spec verify`.
#[derive(Args, Debug)]
struct SpecVerifyCommand {
    /// Specification store root directory.
    #[arg(long, value_name = "DIR")]
    dir: PathBuf,
    /// Specification filename within the store.
    #[arg(long, value_name = "FILENAME")]
    file: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper over every fallible operation a subcommand performs.
#[derive(Debug, Error)]
enum CliError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadConfig {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file did not parse as YAML.
    #[error("failed to parse {path} as YAML: {source}")]
    ParseConfig {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },
    /// A `--property key=value` argument was missing its `=`.
    #[error("malformed property override {0:?}, expected key=value")]
    MalformedProperty(String),
    /// The configuration resolver rejected the resolved values.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The statistics engine rejected the feasibility inputs.
    #[error(transparent)]
    Stats(#[from] StatsError),
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A store load failed its fingerprint verification.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// Writing to stdout or stderr failed.
    #[error("failed to write {stream}: {source}")]
    Output {
        /// `"stdout"` or `"stderr"`.
        stream: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            let _ = write_stderr_line(&format!("error: {err}"));
            ExitCode::FAILURE
        }
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        write_stdout_line(&format!("probtest {}", env!("CARGO_PKG_VERSION")))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        write_stdout_line("usage: probtest <dry-run|baseline|spec> ...")?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::DryRun(command) => command_dry_run(&command),
        Commands::Baseline {
            command,
        } => command_baseline(command),
        Commands::Spec {
            command,
        } => command_spec(command),
    }
}

// ============================================================================
// SECTION: `dry-run`
// ============================================================================

/// Parses `--property key=value` arguments into a lookup map.
fn parse_properties(raw: &[String]) -> CliResult<HashMap<String, String>> {
    let mut properties = HashMap::with_capacity(raw.len());
    for entry in raw {
        let (key, value) = entry.split_once('=').ok_or_else(|| CliError::MalformedProperty(entry.clone()))?;
        properties.insert(key.to_string(), value.to_string());
    }
    Ok(properties)
}

/// Runs the feasibility gate for a declared configuration and prints the
/// result, without executing any sample.
fn command_dry_run(command: &DryRunCommand) -> CliResult<ExitCode> {
    let raw = fs::read_to_string(&command.config).map_err(|source| CliError::ReadConfig {
        path: command.config.clone(),
        source,
    })?;
    let declared: DeclaredConfig = serde_yaml::from_str(&raw).map_err(|source| CliError::ParseConfig {
        path: command.config.clone(),
        source,
    })?;
    let properties = parse_properties(&command.properties)?;

    let resolved = config::resolve(&declared, &command.prefix, &properties, &|key| std::env::var(key).ok())?;

    let report: FeasibilityReport = feasibility_gate(resolved.planned_samples, resolved.min_pass_rate, resolved.threshold_confidence)?;
    write_stdout_line(&format!("n_min={} configured_n={} feasible={}", report.n_min, report.configured_n, report.feasible))?;

    match feasibility_precheck(&command.test_name, &resolved, resolved.planned_samples) {
        Ok(hints) => {
            for hint in hints {
                write_stdout_line(&format!("note: {hint}"))?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(verdict) => {
            write_stdout_line(&verdict.render_console(true))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

// ============================================================================
// SECTION: `baseline`
// ============================================================================

/// Dispatches a `baseline` subcommand.
fn command_baseline(command: BaselineCommand) -> CliResult<ExitCode> {
    match command {
        BaselineCommand::List(command) => {
            let store = BaselineStore::new(command.dir);
            for filename in store.filenames()? {
                write_stdout_line(&filename)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        BaselineCommand::Verify(command) => {
            let store = BaselineStore::new(command.dir);
            let baseline = store.load_verified(&command.file)?;
            write_stdout_line(&format!("ok: {} samples, {} successes, observed_rate={:.4}", baseline.samples_executed, baseline.successes, baseline.observed_rate))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: `spec`
// ============================================================================

/// Dispatches a `spec` subcommand.
fn command_spec(command: SpecCommand) -> CliResult<ExitCode> {
    match command {
        SpecCommand::Verify(command) => {
            let store = SpecStore::new(command.dir);
            let spec = store.load_verified(&command.file)?;
            write_stdout_line(&format!("ok: spec {} approved by {}", spec.version, spec.approved_by))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes one line to stdout, without relying on `println!`.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|source| CliError::Output {
        stream: "stdout",
        source,
    })
}

/// Writes one line to stderr, without relying on `eprintln!`.
fn write_stderr_line(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}").map_err(|source| CliError::Output {
        stream: "stderr",
        source,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, reason = "test assertions use unwrap/expect/panic for clarity on deterministic fixtures")]
    use super::*;

    #[test]
    fn parses_well_formed_property_overrides() {
        let properties = parse_properties(&["probtest.samples=150".to_string()]).expect("parses");
        assert_eq!(properties.get("probtest.samples"), Some(&"150".to_string()));
    }

    #[test]
    fn rejects_a_property_override_missing_its_equals_sign() {
        assert!(parse_properties(&["no-equals-sign".to_string()]).is_err());
    }

    #[test]
    fn dry_run_reports_feasibility_for_a_declared_configuration() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("config.yaml");
        fs::write(&config_path, "samples: 300\nminPassRate: 0.9\n").expect("write config");

        let command = DryRunCommand {
            config: config_path,
            test_name: "checkout".to_string(),
            properties: Vec::new(),
            prefix: "probtest".to_string(),
        };

        let code = command_dry_run(&command).expect("dry run succeeds");
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn dry_run_surfaces_infeasible_verification_as_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("config.yaml");
        fs::write(&config_path, "samples: 2\nminPassRate: 0.999\nthresholdConfidence: 0.999\n").expect("write config");

        let command = DryRunCommand {
            config: config_path,
            test_name: "checkout".to_string(),
            properties: Vec::new(),
            prefix: "probtest".to_string(),
        };

        let code = command_dry_run(&command).expect("dry run runs to completion");
        assert_eq!(code, ExitCode::FAILURE);
    }
}
