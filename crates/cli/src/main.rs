// ParamGrid CLI - parameter comparison, mother DB candidates, and QC

mod checklist;
mod compare;
mod context;
mod exit_codes;
mod qc;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use paramgrid_config::Settings;
use paramgrid_io::StoreError;

use checklist::ChecklistCommands;
use context::Context;
use exit_codes::{store_exit_code, EXIT_CONFIG, EXIT_ERROR, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "pgrid")]
#[command(about = "Compare equipment parameter exports, derive mother DB defaults, and run QC")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the per-user config directory)
    #[arg(long, global = true, env = "PGRID_CONFIG")]
    config: Option<PathBuf>,

    /// Emit machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare parameter values across sources
    #[command(after_help = "\
Examples:
  pgrid compare tool_a.csv tool_b.csv tool_c.xlsx
  pgrid compare *.csv --differences-only
  pgrid compare a.csv b.csv --long --json")]
    Compare {
        /// Source files (CSV, TSV, XLSX, ODS)
        #[arg(required = true)]
        sources: Vec<String>,

        /// Only show parameters whose values differ
        #[arg(long)]
        differences_only: bool,

        /// One record per (parameter, source) instead of a wide table
        #[arg(long)]
        long: bool,

        /// Fail if any source cannot be loaded
        #[arg(long)]
        strict: bool,
    },

    /// Suggest mother DB defaults from values shared across sources
    #[command(after_help = "\
Examples:
  pgrid candidates tool_*.csv
  pgrid candidates tool_*.csv --min-rate 0.6 --json")]
    Candidates {
        #[arg(required = true)]
        sources: Vec<String>,

        /// Minimum fraction of sources a value must appear in, within [0, 1]
        #[arg(long)]
        min_rate: Option<f64>,

        /// Fail if any source cannot be loaded
        #[arg(long)]
        strict: bool,
    },

    /// Validate each source structurally and against the checklist
    #[command(after_help = "\
Exit code 10 when any source fails QC, 11 when every loaded source passes
but one or more could not be read.

Examples:
  pgrid qc tool_a.csv
  pgrid qc tool_a.csv --database checklist.db --json
  pgrid qc tool_a.csv --no-checklist")]
    Qc {
        #[arg(required = true)]
        sources: Vec<String>,

        /// Checklist database (defaults to checklist.database)
        #[arg(long)]
        database: Option<PathBuf>,

        /// Structural checks only
        #[arg(long)]
        no_checklist: bool,
    },

    /// Manage the checklist database
    Checklist {
        /// Checklist database (defaults to checklist.database)
        #[arg(long, global = true)]
        database: Option<PathBuf>,

        #[command(subcommand)]
        command: ChecklistCommands,
    },

    /// Settings file helpers
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the settings file path
    Path,
    /// Write a commented default settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_COMMIT_HASH"),
        ")",
        "\ntarget:  ",
        env!("TARGET"),
        "\nschema:  checklist v2",
    )
}

/// Logs go to stderr so `--json` output stays clean. `PGRID_LOG` takes an
/// EnvFilter directive; the default is warnings only.
fn init_logging() {
    let filter = EnvFilter::try_from_env("PGRID_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { config, json, command } = cli;
    let load = || Context::load(config.as_deref());

    match command {
        Commands::Compare {
            sources,
            differences_only,
            long,
            strict,
        } => compare::cmd_compare(&load()?, sources, differences_only, long, strict, json),
        Commands::Candidates {
            sources,
            min_rate,
            strict,
        } => compare::cmd_candidates(&load()?, sources, min_rate, strict, json),
        Commands::Qc {
            sources,
            database,
            no_checklist,
        } => qc::cmd_qc(&load()?, sources, database, no_checklist, json),
        Commands::Checklist { database, command } => checklist::cmd_checklist(&load()?, command, database, json),
        Commands::Config(cmd) => cmd_config(cmd, config.clone(), json),
    }
}

// ============================================================================
// config
// ============================================================================

fn cmd_config(cmd: ConfigCommands, config: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let path = config.unwrap_or_else(Settings::config_path);
    match cmd {
        ConfigCommands::Path => {
            if json {
                print_json(&serde_json::json!({ "path": path, "exists": path.exists() }))?;
            } else {
                println!("{}", path.display());
            }
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::new(EXIT_CONFIG, format!("{} already exists", path.display()))
                    .with_hint("pass --force to overwrite"));
            }
            if path.exists() {
                std::fs::remove_file(&path).map_err(|e| CliError::io(format!("{}: {e}", path.display())))?;
            }
            Settings::write_default(&path).map_err(|e| CliError::io(e.to_string()))?;
            eprintln!("wrote {}", path.display());
        }
    }
    Ok(())
}

// ============================================================================
// Errors and output
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    /// Create error from a checklist store error with its registry exit code.
    pub fn store(err: StoreError) -> Self {
        let code = store_exit_code(&err);
        let hint = match &err {
            StoreError::SchemaVersion { .. } => Some("run `pgrid checklist migrate`".to_string()),
            StoreError::Integrity { .. } => {
                Some("deactivate the existing item or give the new one a distinct module/part".to_string())
            }
            StoreError::NoSnapshot => Some("snapshots are taken by `pgrid checklist migrate`".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value).map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
    println!("{out}");
    Ok(())
}
