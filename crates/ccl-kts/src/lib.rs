//! Kotlin DSL front end: parses `*.gradle.kts` scripts into a syntax tree,
//! binds names and types against a model of the Gradle API and runs the
//! configuration-cache analyzer over the result.

pub mod binder;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod tree;

use ccl_core::diagnostics::Diagnostic;
use ccl_core::span::{FileId, SourceFile};
use ccl_core::{AnalysisReport, ConfigurationCacheAnalyzer};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info_span};

pub use binder::SemanticModel;
pub use model::ApiModel;
pub use parser::ScriptParser;
pub use tree::ScriptTree;

#[derive(Debug, Error)]
pub enum KtsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: parser::ParseError,
    },
    #[error(transparent)]
    Model(#[from] model::ModelError),
}

pub type Result<T> = std::result::Result<T, KtsError>;

/// Everything known about one analyzed script.
#[derive(Debug, Clone)]
pub struct ScriptAnalysis {
    pub tree: ScriptTree,
    pub report: AnalysisReport,
    /// Recoverable syntax errors; the analysis ran regardless.
    pub parse_diagnostics: Vec<Diagnostic>,
}

impl ScriptAnalysis {
    pub fn file(&self) -> &SourceFile {
        self.tree.file()
    }
}

/// Parse, bind and analyze one script held in memory.
pub fn analyze_source(
    file: SourceFile,
    api: &ApiModel,
    analyzer: &ConfigurationCacheAnalyzer,
) -> Result<ScriptAnalysis> {
    let span = info_span!("script", path = %file.path().display());
    let _enter = span.enter();

    let path = file.path.clone();
    let parser = ScriptParser::new();
    let tree = parser
        .parse(file)
        .map_err(|source| KtsError::Parse { path, source })?;
    let parse_diagnostics = parser.diagnostics().get_diagnostics();
    if !parse_diagnostics.is_empty() {
        debug!(errors = parse_diagnostics.len(), "script has syntax errors");
    }

    let model = SemanticModel::bind(&tree, api);
    let report = analyzer.analyze(&tree, &model);
    Ok(ScriptAnalysis {
        tree,
        report,
        parse_diagnostics,
    })
}

pub fn analyze_path(
    id: FileId,
    path: &Path,
    api: &ApiModel,
    analyzer: &ConfigurationCacheAnalyzer,
) -> Result<ScriptAnalysis> {
    let source = std::fs::read_to_string(path).map_err(|source| KtsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    analyze_source(SourceFile::new(id, path, &source), api, analyzer)
}
