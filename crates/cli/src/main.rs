// clipsheet - merge media-mention exports into a formatted report workbook

mod exit_codes;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use clipsheet_config::{ConfigError, ReportSettings};
use clipsheet_report::{ReportError, TEMPLATE_VERSION};

use exit_codes::{config_exit_code, report_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "clipsheet")]
#[command(about = "Merge media-mention exports into a formatted report workbook")]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/clipsheet/settings.toml)
    #[arg(long, global = true, env = "CLIPSHEET_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging on stderr (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a report sheet from a primary export and optional secondary export
    #[command(after_help = "\
Examples:
  clipsheet build 12_client.csv
  clipsheet build 12_client.csv --secondary monitoring.xlsx -o coverage.xlsx
  clipsheet build 12_client.csv --baseline coverage.xlsx -o coverage.xlsx --prefix 12
  clipsheet build clips.csv --sheet March --headline 'Spring launch' --json")]
    Build(report::BuildArgs),

    /// Print extracted and merged rows with their issues as JSON
    #[command(after_help = "\
Examples:
  clipsheet extract 12_client.csv
  clipsheet extract 12_client.csv --secondary monitoring.xlsx -o rows.json")]
    Extract(report::ExtractArgs),

    /// Rebuild the combined LIST sheet from every numbered sheet of a workbook
    #[command(after_help = "\
Examples:
  clipsheet list coverage.xlsx
  clipsheet list coverage.xlsx -o combined.xlsx --sheet ALL")]
    List(report::ListArgs),

    /// Show the settings file path and effective settings
    #[command(after_help = "\
Examples:
  clipsheet config
  clipsheet config --init")]
    Config {
        /// Write the default settings to the settings path if no file exists
        #[arg(long)]
        init: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Config { init } => cmd_config(cli.config, init),
        Commands::Build(args) => {
            load_settings(cli.config.as_deref()).and_then(|settings| report::cmd_build(args, &settings))
        }
        Commands::Extract(args) => {
            load_settings(cli.config.as_deref()).and_then(|settings| report::cmd_extract(args, &settings))
        }
        Commands::List(args) => {
            load_settings(cli.config.as_deref()).and_then(|settings| report::cmd_list(args, &settings))
        }
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

fn load_settings(path: Option<&std::path::Path>) -> Result<ReportSettings, CliError> {
    ReportSettings::load(path).map_err(CliError::config)
}

// ============================================================================
// config
// ============================================================================

fn cmd_config(path: Option<PathBuf>, init: bool) -> Result<(), CliError> {
    let path = path.unwrap_or_else(ReportSettings::config_path);

    if init {
        if path.exists() {
            return Err(CliError::args(format!("{} already exists", path.display()))
                .with_hint("edit the file, or remove it to start over"));
        }
        ReportSettings::default().save_to(&path).map_err(CliError::config)?;
        eprintln!("wrote {}", path.display());
        return Ok(());
    }

    let settings = if path.exists() {
        ReportSettings::load_from(&path).map_err(CliError::config)?
    } else {
        eprintln!("# {} not found, showing defaults", path.display());
        ReportSettings::default()
    };
    let text = settings.to_toml().map_err(CliError::config)?;
    println!("# settings: {}", path.display());
    println!("# bundled template: v{}", TEMPLATE_VERSION);
    print!("{text}");
    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Parse { .. } | ConfigError::Invalid(_) => {
                Some("run `clipsheet config` to see the expected keys".to_string())
            }
            _ => None,
        };
        Self { code: config_exit_code(&err), message: err.to_string(), hint }
    }

    /// Create error from a build failure with its exit code.
    pub fn report(err: ReportError) -> Self {
        let hint = match &err {
            ReportError::Read { .. } => Some("check the path and file permissions".to_string()),
            ReportError::TemplateUnreadable(_) => {
                Some("fix [layout].template_path, or remove it to use the bundled template".to_string())
            }
            ReportError::NoNumericSheets => {
                Some("report sheets are found by all-digit names such as `12`".to_string())
            }
            ReportError::NoRows => {
                Some("every primary row was dropped; run `clipsheet extract` to see why".to_string())
            }
            _ => None,
        };
        Self { code: report_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
