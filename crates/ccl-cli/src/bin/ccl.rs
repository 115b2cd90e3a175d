//! ccl: configuration-cache lint for Gradle Kotlin build scripts
//!
//! # Usage
//!
//! ```bash
//! # Check every build script below the current directory
//! ccl check
//!
//! # Check one module, machine-readable
//! ccl check app/build.gradle.kts --format json
//!
//! # Show the unsupported-symbol tables in effect
//! ccl tables --symbols ccl-symbols.toml
//! ```

use ccl_cli::{
    cli::CliConfig,
    commands::{self, check::CheckArgs, tables::TablesArgs},
    diagnostics::setup_error_reporting,
    Result,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, error};

#[derive(Parser)]
#[command(
    name = "ccl",
    version = env!("CARGO_PKG_VERSION"),
    about = "Finds Gradle Kotlin DSL code that breaks the configuration cache",
    long_about = r#"
Finds references made from task execution blocks (doLast, doFirst) that the
Gradle configuration cache cannot serialize: script object members, task
accessors such as `project`, and values of unserializable types.

EXAMPLES:
    ccl check                              # Check build scripts below .
    ccl check app --format plain           # One line per problem
    ccl tables                             # Print the symbol tables
    "#
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Set log level (overrides --verbose/--quiet)
    #[arg(long, global = true, value_enum)]
    log: Option<LogLevel>,

    /// Set log output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    directory: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check build scripts for configuration cache problems
    Check(CheckArgs),

    /// Print the effective unsupported-symbol tables as TOML
    Tables(TablesArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_error_reporting()?;
    setup_logging(cli.verbose, cli.quiet, cli.log, cli.log_format)?;

    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)?;
    }

    let result = CliConfig::load(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Check(args) => {
            commands::check_command(args, &config).map(|summary| summary.exit_code())
        }
        Commands::Tables(args) => commands::tables_command(args, &config).map(|_| 0),
    });

    match result {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{}", e);
            debug!(?e, "detailed error context");
            std::process::exit(1);
        }
    }
}

fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_level: Option<LogLevel>,
    log_format: LogFormat,
) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if let Some(level) = log_level {
        EnvFilter::new(match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    } else if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // reports go to stdout, logs stay on stderr
    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_level(true);

    match log_format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(formatter)
                .with(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(formatter.json())
                .with(filter)
                .init();
        }
    }

    Ok(())
}
