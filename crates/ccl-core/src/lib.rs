pub mod analyzer;
pub mod classifier;
pub mod diagnostics;
pub mod error;
pub mod oracle;
pub mod problem;
pub mod registry;
pub mod scope;
pub mod sink;
pub mod span;
pub mod syntax;
pub mod tables;
pub mod walker;

#[cfg(test)]
mod testing;

// Re-export commonly used items for convenience
pub use tracing;

pub use analyzer::{analyze, is_build_script, AnalysisReport, ConfigurationCacheAnalyzer};
pub use oracle::{CallableDescriptor, CallableKind, SemanticOracle, TypeDescriptor};
pub use syntax::{DeclarationKind, NodeId, NodeKind, SyntaxTree};
pub use tables::UnsupportedSymbols;

pub type Error = crate::error::CoreError;
pub type Result<T> = crate::error::Result<T>;
