//! Print the effective unsupported-symbol tables

use super::common::load_symbols;
use crate::{cli::CliConfig, Result};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the tables command
#[derive(Debug, Clone, Args)]
pub struct TablesArgs {
    /// Override table applied on top of the built-in one
    #[arg(long)]
    pub symbols: Option<PathBuf>,
}

/// Execute the tables command, returning the TOML it printed
pub fn tables_command(args: TablesArgs, config: &CliConfig) -> Result<String> {
    let symbols = load_symbols(args.symbols.as_deref(), config)?;
    let rendered = symbols.to_toml_string()?;
    print!("{}", rendered);
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_override_extends_the_builtin_tables() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("symbols.toml");
        std::fs::write(&path, "extra_task_accessors = [\"getLogger\"]\n").unwrap();

        let rendered = tables_command(
            TablesArgs {
                symbols: Some(path),
            },
            &CliConfig::default(),
        )
        .unwrap();
        assert!(rendered.contains("\"getLogger\""));
        assert!(rendered.contains("\"getProject\""));
        assert!(rendered.contains("java.lang.Thread"));
    }
}
