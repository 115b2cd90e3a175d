use crate::diagnostics::Diagnostic;
use crate::oracle::SemanticOracle;
use crate::syntax::SyntaxTree;
use crate::tables::UnsupportedSymbols;
use crate::walker::{AnalysisStats, Walker};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info_span;

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub diagnostics: Vec<Diagnostic>,
    pub stats: AnalysisStats,
}

/// Configuration-cache analysis of build scripts. Cheap to clone and safe to
/// share between threads; every call to [`analyze`](Self::analyze) starts
/// from fresh per-file state.
#[derive(Debug, Clone)]
pub struct ConfigurationCacheAnalyzer {
    symbols: Arc<UnsupportedSymbols>,
}

impl Default for ConfigurationCacheAnalyzer {
    fn default() -> Self {
        Self::new(UnsupportedSymbols::default())
    }
}

impl ConfigurationCacheAnalyzer {
    pub fn new(symbols: UnsupportedSymbols) -> Self {
        Self {
            symbols: Arc::new(symbols),
        }
    }

    pub fn symbols(&self) -> &UnsupportedSymbols {
        &self.symbols
    }

    pub fn analyze<T, O>(&self, tree: &T, oracle: &O) -> AnalysisReport
    where
        T: SyntaxTree,
        O: SemanticOracle + ?Sized,
    {
        let span = info_span!("analyze", root = %tree.root());
        let _enter = span.enter();

        let (mut diagnostics, stats) = Walker::new(tree, oracle, &self.symbols).run();
        diagnostics.sort_by_key(|d| d.span.map(|s| (s.lo, s.hi)));
        tracing::debug!(
            diagnostics = diagnostics.len(),
            execution_blocks = stats.execution_blocks,
            declarations = stats.declarations_analyzed,
            "analysis finished"
        );
        AnalysisReport { diagnostics, stats }
    }
}

/// Analyze one file with the built-in tables.
pub fn analyze<T, O>(tree: &T, oracle: &O) -> Vec<Diagnostic>
where
    T: SyntaxTree,
    O: SemanticOracle + ?Sized,
{
    ConfigurationCacheAnalyzer::default()
        .analyze(tree, oracle)
        .diagnostics
}

/// Project build scripts only: settings and init scripts never register
/// tasks that the configuration cache stores.
pub fn is_build_script(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".gradle.kts")
        && !matches!(name, "settings.gradle.kts" | "init.gradle.kts")
        && !name.ends_with(".settings.gradle.kts")
        && !name.ends_with(".init.gradle.kts")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::TypeDescriptor;
    use crate::syntax::DeclarationKind;
    use crate::testing::{MockOracle, MockTree};
    use pretty_assertions::assert_eq;

    #[test]
    fn build_scripts_are_recognized_by_name() {
        assert!(is_build_script(Path::new("build.gradle.kts")));
        assert!(is_build_script(Path::new("app/publishing.gradle.kts")));
        assert!(!is_build_script(Path::new("settings.gradle.kts")));
        assert!(!is_build_script(Path::new("gradle/ci.init.gradle.kts")));
        assert!(!is_build_script(Path::new("build.gradle")));
        assert!(!is_build_script(Path::new("Main.kt")));
    }

    #[test]
    fn diagnostics_are_ordered_by_position() {
        // the bubbled origin sits after its trigger in the file
        let mut tree = MockTree::new();
        let mut oracle = MockOracle::default();
        let root = tree.root_id();
        let register = tree.call(root, 1);
        tree.name_ref(register, "register", 1);
        let config = tree.lambda(register, 1);
        let do_last = tree.call(config, 2);
        let do_last_callee = tree.name_ref(do_last, "doLast", 2);
        oracle.receiver(do_last_callee, TypeDescriptor::new("org.gradle.api.Task"));
        let body = tree.lambda(do_last, 2);
        let call = tree.call(body, 3);
        let callee = tree.name_ref(call, "run", 3);
        let class_a = tree.declaration(root, DeclarationKind::Class, "A", 6);
        let run = tree.declaration(class_a, DeclarationKind::Function, "run", 7);
        let build_dir = tree.name_ref(run, "buildDir", 8);
        oracle.receiver(build_dir, TypeDescriptor::new("Build_gradle"));
        oracle.reference(callee, run);

        let report = ConfigurationCacheAnalyzer::default().analyze(&tree, &oracle);
        let spans: Vec<_> = report.diagnostics.iter().filter_map(|d| d.span).collect();
        assert_eq!(spans, vec![tree.span_of(callee), tree.span_of(build_dir)]);
        assert_eq!(report.stats.declarations_analyzed, 1);
    }
}
