//! CLI configuration and settings management

use crate::{CliError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "ccl.toml";

/// CLI configuration loaded from `ccl.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Settings for `ccl check`
    pub check: CheckConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Output format when `--format` is not given
    pub format: OutputFormat,

    /// Globs a build script must match, relative to the searched directory
    pub include: Vec<String>,

    /// Globs that remove build scripts from the search
    pub exclude: Vec<String>,

    /// Unsupported-symbol override table
    pub symbols: Option<PathBuf>,

    /// Exit with status 1 when problems are reported
    pub fail_on_problems: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Pretty,
            include: Vec::new(),
            exclude: vec!["**/build/**".to_string(), "**/.gradle/**".to_string()],
            symbols: None,
            fail_on_problems: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Source snippets with labels
    Pretty,
    /// One line per problem, `path:line:col`
    Plain,
    /// Machine-readable report
    Json,
}

impl CliConfig {
    /// Load configuration from an explicit file, else from `ccl.toml` in the
    /// working directory, else from the user config directory.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local = Path::new(CONFIG_FILE_NAME);
        if local.is_file() {
            return Self::load_from_file(local);
        }

        if let Some(user_config) = Self::default_config_path() {
            if user_config.is_file() {
                return Self::load_from_file(&user_config);
            }
        }

        debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file. A relative `symbols` path is
    /// taken relative to the file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| {
            CliError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        if let (Some(symbols), Some(base)) = (&config.check.symbols, path.parent()) {
            if symbols.is_relative() {
                config.check.symbols = Some(base.join(symbols));
            }
        }
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Get the default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ccl").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.check.format, OutputFormat::Pretty);
        assert!(config.check.fail_on_problems);
        assert!(config.check.symbols.is_none());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[check]\nformat = \"json\"").unwrap();

        let config = CliConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.check.format, OutputFormat::Json);
        assert_eq!(config.check.exclude, CheckConfig::default().exclude);
    }

    #[test]
    fn test_symbols_path_is_relative_to_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[check]\nsymbols = \"tables/extra.toml\"\n").unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(
            config.check.symbols,
            Some(dir.path().join("tables/extra.toml"))
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[check]\nformats = \"json\"").unwrap();

        let err = CliConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, CliError::Config(message) if message.contains("Failed to parse")));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(CliConfig::load(Some(&missing)).is_err());
    }
}
