// lmatch - reconcile an internal ledger against a provider ledger

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_ERROR, EXIT_INGEST, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "lmatch")]
#[command(about = "Reconcile two transaction ledgers and score mismatches by risk")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG also works.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile an internal ledger CSV against a provider ledger CSV
    #[command(after_help = "\
Examples:
  lmatch run internal.csv provider.csv
  lmatch run internal.csv provider.csv --json
  lmatch run internal.csv provider.csv --config scoring.toml --output result.json
  lmatch run internal.csv provider.csv --export-dir out/ --zip out/results.zip
  lmatch run internal.csv provider.csv --fail-on-high-risk")]
    Run(run::RunArgs),

    /// Print the inferred canonical column mapping of a CSV file
    #[command(after_help = "\
Examples:
  lmatch map provider.csv
  lmatch -vv map provider.csv   # per-header keyword scores on stderr")]
    Map {
        /// CSV file whose header row is mapped
        file: PathBuf,
    },

    /// Validate a scoring config without running
    #[command(after_help = "\
Examples:
  lmatch validate-config scoring.toml")]
    ValidateConfig {
        /// Path to the scoring TOML file
        config: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => run::cmd_run(args),
        Commands::Map { file } => run::cmd_map(file),
        Commands::ValidateConfig { config } => run::cmd_validate_config(config),
    };

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

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn ingest(msg: impl Into<String>) -> Self {
        Self::new(EXIT_INGEST, msg)
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
