//! Where classified problems go. Inside a real execution block they become
//! diagnostics right away; inside a speculative declaration body they are
//! buffered and later stored on the declaration's record.

use crate::diagnostics::Diagnostic;
use crate::problem::Problem;
use crate::span::Span;
use crate::syntax::NodeId;
use std::collections::HashSet;

pub const SOURCE_CONTEXT: &str = "configuration-cache";

/// A problem to be shown at `at`.
#[derive(Debug, Clone, Copy)]
pub struct Report<'p> {
    pub at: NodeId,
    pub span: Span,
    pub problem: &'p Problem,
    /// Line to cite when `at` is not where the problem was found.
    pub line_reference: Option<usize>,
}

pub trait ProblemSink {
    fn is_reported(&self, node: NodeId) -> bool;

    fn report(&mut self, report: Report<'_>);
}

/// Emits diagnostics to the host, at most one per node.
#[derive(Debug, Default)]
pub struct ImmediateSink {
    reported: HashSet<NodeId>,
    diagnostics: Vec<Diagnostic>,
}

impl ImmediateSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl ProblemSink for ImmediateSink {
    fn is_reported(&self, node: NodeId) -> bool {
        self.reported.contains(&node)
    }

    fn report(&mut self, report: Report<'_>) {
        if !self.reported.insert(report.at) {
            return;
        }
        let problem = report.problem;
        let mut diagnostic = Diagnostic::warning(problem.render(report.line_reference))
            .with_span(report.span)
            .with_code(problem.kind.code())
            .with_source_context(SOURCE_CONTEXT);
        if let Some(suggestion) = &problem.suggestion {
            diagnostic = diagnostic.with_suggestion(suggestion.clone());
        }
        self.diagnostics.push(diagnostic);
    }
}

/// Collects problems for a declaration record instead of emitting them.
#[derive(Debug, Default)]
pub struct BufferedSink {
    visited: HashSet<NodeId>,
    origins: HashSet<NodeId>,
    problems: Vec<Problem>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_problems(self) -> Vec<Problem> {
        self.problems
    }
}

impl ProblemSink for BufferedSink {
    fn is_reported(&self, node: NodeId) -> bool {
        self.visited.contains(&node)
    }

    fn report(&mut self, report: Report<'_>) {
        self.visited.insert(report.at);
        if self.origins.insert(report.problem.origin) {
            self.problems.push(report.problem.clone());
        }
    }
}
