//! Pieces shared by several commands

use crate::{cli::CliConfig, Result};
use ccl_core::UnsupportedSymbols;
use std::path::Path;
use tracing::info;

/// Effective unsupported-symbol tables: the command-line file, else the
/// configured one, else the built-in tables.
pub fn load_symbols(explicit: Option<&Path>, config: &CliConfig) -> Result<UnsupportedSymbols> {
    match explicit.or(config.check.symbols.as_deref()) {
        Some(path) => {
            info!(path = %path.display(), "loading unsupported-symbol overrides");
            Ok(UnsupportedSymbols::load(path)?)
        }
        None => Ok(UnsupportedSymbols::default()),
    }
}
