//! Unsupported-symbol tables: which types cannot be serialized into the
//! configuration cache and which task accessors must not run at execution
//! time. Read-only once built, so one instance can be shared by every
//! analysis.

use crate::error::{CoreError, Result};
use crate::oracle::TypeDescriptor;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

const BUILTIN_TABLE: &str = include_str!("../data/unsupported-symbols.toml");

static BUILTIN: Lazy<UnsupportedSymbols> = Lazy::new(|| {
    let overrides: SymbolTableOverrides =
        toml::from_str(BUILTIN_TABLE).expect("embedded unsupported-symbols.toml must parse");
    UnsupportedSymbols::empty().apply(overrides)
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsupportedSymbols {
    pub version: u32,
    /// Synthetic class the build script compiles to.
    pub script_type: String,
    pub task_type: String,
    /// Task members whose trailing block runs at execution time.
    pub execution_blocks: BTreeSet<String>,
    pub forbidden_expression_types: Vec<String>,
    pub task_accessors: BTreeSet<String>,
    pub unserializable_types: BTreeSet<String>,
}

/// Partial table as written in a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SymbolTableOverrides {
    pub version: Option<u32>,
    pub script_type: Option<String>,
    pub task_type: Option<String>,
    pub execution_blocks: Option<Vec<String>>,
    pub forbidden_expression_types: Option<Vec<String>>,
    pub task_accessors: Option<Vec<String>>,
    pub unserializable_types: Option<Vec<String>>,
    pub extra_task_accessors: Vec<String>,
    pub extra_unserializable_types: Vec<String>,
}

impl Default for UnsupportedSymbols {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

impl UnsupportedSymbols {
    pub fn builtin() -> &'static UnsupportedSymbols {
        &BUILTIN
    }

    fn empty() -> Self {
        Self {
            version: 0,
            script_type: String::new(),
            task_type: String::new(),
            execution_blocks: BTreeSet::new(),
            forbidden_expression_types: Vec::new(),
            task_accessors: BTreeSet::new(),
            unserializable_types: BTreeSet::new(),
        }
    }

    pub fn apply(mut self, overrides: SymbolTableOverrides) -> Self {
        if let Some(version) = overrides.version {
            self.version = version;
        }
        if let Some(script_type) = overrides.script_type {
            self.script_type = script_type;
        }
        if let Some(task_type) = overrides.task_type {
            self.task_type = task_type;
        }
        if let Some(blocks) = overrides.execution_blocks {
            self.execution_blocks = blocks.into_iter().collect();
        }
        if let Some(types) = overrides.forbidden_expression_types {
            self.forbidden_expression_types = types;
        }
        if let Some(accessors) = overrides.task_accessors {
            self.task_accessors = accessors.into_iter().collect();
        }
        if let Some(types) = overrides.unserializable_types {
            self.unserializable_types = types.into_iter().collect();
        }
        self.task_accessors.extend(overrides.extra_task_accessors);
        self.unserializable_types
            .extend(overrides.extra_unserializable_types);
        self
    }

    /// Built-in tables with the overrides in `source` applied on top.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let overrides: SymbolTableOverrides = toml::from_str(source)?;
        Ok(Self::default().apply(overrides))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn is_script_type(&self, ty: &TypeDescriptor) -> bool {
        ty.is(&self.script_type)
    }

    pub fn is_task_like(&self, ty: &TypeDescriptor) -> bool {
        ty.is_instance_of(&self.task_type)
    }

    pub fn is_execution_block(&self, name: &str) -> bool {
        self.execution_blocks.contains(name)
    }

    pub fn is_unsupported_accessor(&self, name: &str) -> bool {
        self.task_accessors.contains(name)
    }

    /// The listed type `ty` is, or inherits from, if any.
    pub fn unserializable_match<'t>(&self, ty: &'t TypeDescriptor) -> Option<&'t str> {
        ty.lineage()
            .find(|name| self.unserializable_types.contains(*name))
    }

    pub fn is_forbidden_expression_type(&self, ty: &TypeDescriptor) -> bool {
        self.forbidden_expression_types
            .iter()
            .any(|name| ty.is_instance_of(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_table_parses() {
        let symbols = UnsupportedSymbols::builtin();
        assert_eq!(symbols.version, 1);
        assert_eq!(symbols.script_type, "Build_gradle");
        assert!(symbols.is_execution_block("doLast"));
        assert!(symbols.is_execution_block("doFirst"));
        assert!(symbols.is_unsupported_accessor("getTaskDependencies"));
        assert!(symbols
            .unserializable_types
            .contains("org.gradle.api.artifacts.Configuration"));
    }

    #[test]
    fn subtypes_of_listed_types_match() {
        let symbols = UnsupportedSymbols::builtin();
        let stream = TypeDescriptor::new("java.io.FileInputStream")
            .with_supertypes(["java.io.InputStream", "java.lang.Object"]);
        assert_eq!(symbols.unserializable_match(&stream), Some("java.io.InputStream"));
        let file = TypeDescriptor::new("java.io.File");
        assert_eq!(symbols.unserializable_match(&file), None);
    }

    #[test]
    fn overrides_replace_or_extend() {
        let symbols = UnsupportedSymbols::from_toml_str(
            r#"
            version = 2
            execution_blocks = ["doLast"]
            extra_task_accessors = ["getConvention"]
            extra_unserializable_types = ["com.example.Live"]
            "#,
        )
        .unwrap();
        assert_eq!(symbols.version, 2);
        assert!(!symbols.is_execution_block("doFirst"));
        assert!(symbols.is_unsupported_accessor("getConvention"));
        assert!(symbols.is_unsupported_accessor("getProject"));
        assert!(symbols.unserializable_types.contains("com.example.Live"));
        assert!(symbols.unserializable_types.contains("java.lang.Thread"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = UnsupportedSymbols::from_toml_str("execution_block = []").unwrap_err();
        assert!(matches!(err, CoreError::Table(_)));
    }

    #[test]
    fn tables_round_trip_through_toml() {
        let text = UnsupportedSymbols::builtin().to_toml_string().unwrap();
        let reparsed = UnsupportedSymbols::from_toml_str(&text).unwrap();
        assert_eq!(&reparsed, UnsupportedSymbols::builtin());
    }
}
