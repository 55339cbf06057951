// pricecheck CLI - reconcile a price list against a website catalog

mod exit_codes;
mod logging;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use logging::{init_logging, LogConfig, LogFormat, Rotation};
use recon::RunOptions;

#[derive(Parser)]
#[command(name = "pricecheck")]
#[command(about = "Find price list items missing on the website and site items missing from the price list")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Also append log records to this file
    #[arg(long, global = true, env = "PRICECHECK_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Roll the log file over once it would exceed this many bytes (0: never)
    #[arg(long, global = true, env = "PRICECHECK_LOG_MAX_BYTES", default_value_t = 5_000_000)]
    log_max_bytes: u64,

    /// Rolled-over log files to keep as <file>.1 .. <file>.N (0: never roll over)
    #[arg(long, global = true, default_value_t = 5)]
    log_backups: u32,

    /// Log record format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the datasets named in a config file and write the result tables
    #[command(after_help = "\
Examples:
  pricecheck run
  pricecheck run config/paths.json --json
  pricecheck run paths.toml --out-dir reports/ --summary reports/stats.json
  pricecheck run paths.json --strict --dry-run")]
    Run {
        /// Path to the .json or .toml config file
        #[arg(default_value = "paths.json")]
        config: PathBuf,

        /// Print run statistics as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write run statistics as JSON to this file
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Exit with code 1 when any result table has rows
        #[arg(long)]
        strict: bool,

        /// Reconcile and report, but write no result tables
        #[arg(long)]
        dry_run: bool,

        /// Directory for result tables (default: the config file's directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Worksheet to read from spreadsheet inputs (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
    },

    /// Check a config file and the columns of both datasets without reconciling
    #[command(after_help = "\
Examples:
  pricecheck validate
  pricecheck validate config/paths.toml")]
    Validate {
        /// Path to the .json or .toml config file
        #[arg(default_value = "paths.json")]
        config: PathBuf,

        /// Worksheet to read from spreadsheet inputs (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
    },

    /// Print the default configuration, including the built-in exclusion rules
    Defaults,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("PRICECHECK_GIT_HASH"), ")",
        "\nengine:  pricecheck-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::from(EXIT_SUCCESS)
            };
        }
    };

    let log_config = LogConfig::from_verbosity(cli.verbose, cli.quiet)
        .with_format(cli.log_format)
        .with_log_file(cli.log_file.clone())
        .with_rotation(Rotation {
            max_bytes: cli.log_max_bytes,
            backups: cli.log_backups,
        });
    if let Err(e) = init_logging(&log_config) {
        eprintln!("error: cannot open log file: {e}");
        return ExitCode::from(EXIT_USAGE);
    }

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            summary,
            strict,
            dry_run,
            out_dir,
            sheet,
        } => recon::cmd_run(
            config,
            RunOptions {
                json,
                summary,
                strict,
                dry_run,
                out_dir,
                sheet,
            },
        ),
        Commands::Validate { config, sheet } => recon::cmd_validate(config, sheet),
        Commands::Defaults => recon::cmd_defaults(),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                tracing::error!(code, "{message}");
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {hint}");
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
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
