//! Command-line front end for the configuration-cache lint.
//!
//! Finds Gradle Kotlin build scripts, analyzes them in parallel and reports
//! every reference that would break the configuration cache.

pub mod cli;
pub mod commands;
pub mod diagnostics;
pub mod utils;

// CLI-specific error handling
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum CliError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("Invalid input: {0}")]
        InvalidInput(String),

        #[error(transparent)]
        Symbols(#[from] ccl_core::Error),

        #[error(transparent)]
        Script(#[from] ccl_kts::KtsError),

        #[error("Failed to write report: {0}")]
        Report(#[from] serde_json::Error),
    }

    pub type Result<T> = std::result::Result<T, CliError>;
}

pub use error::{CliError, Result};
