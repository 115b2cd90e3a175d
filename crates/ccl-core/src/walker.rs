//! Single depth-first walk over a build script that tracks the active
//! execution scope and hands every reference made at execution time to the
//! classifier.

use crate::classifier::Classifier;
use crate::diagnostics::Diagnostic;
use crate::oracle::{CallableKind, SemanticOracle};
use crate::registry;
use crate::scope::{Declaration, DeclarationRegistry, EnclosingScope, ExecutionScope, RecordState};
use crate::sink::{BufferedSink, ImmediateSink, ProblemSink};
use crate::syntax::{DeclarationKind, NodeId, NodeKind, SyntaxTree};
use crate::tables::UnsupportedSymbols;
use serde::Serialize;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisStats {
    pub execution_blocks: usize,
    pub declarations_analyzed: usize,
    pub references_classified: usize,
    pub skipped_nodes: usize,
}

pub struct Walker<'a, T, O: ?Sized> {
    tree: &'a T,
    oracle: &'a O,
    symbols: &'a UnsupportedSymbols,
    registry: DeclarationRegistry,
    stats: AnalysisStats,
}

impl<'a, T, O> Walker<'a, T, O>
where
    T: SyntaxTree,
    O: SemanticOracle + ?Sized,
{
    pub fn new(tree: &'a T, oracle: &'a O, symbols: &'a UnsupportedSymbols) -> Self {
        Self {
            tree,
            oracle,
            symbols,
            registry: DeclarationRegistry::new(),
            stats: AnalysisStats::default(),
        }
    }

    pub fn run(mut self) -> (Vec<Diagnostic>, AnalysisStats) {
        let mut sink = ImmediateSink::new();
        let mut scope = ExecutionScope::Configuration;
        self.walk(self.tree.root(), &mut scope, &mut sink);
        (sink.into_diagnostics(), self.stats)
    }

    fn walk(&mut self, node: NodeId, scope: &mut ExecutionScope, sink: &mut dyn ProblemSink) {
        match self.tree.kind(node) {
            NodeKind::Declaration(kind) => self.visit_declaration(node, kind, scope, sink),
            NodeKind::Call => self.visit_call(node, scope, sink),
            NodeKind::NameReference => {
                self.walk_children(node, scope, sink);
                self.visit_reference(node, scope, sink);
            }
            NodeKind::Error => {
                debug!(node = %node, "skipping unparsed node");
                self.stats.skipped_nodes += 1;
                self.walk_children(node, scope, sink);
            }
            NodeKind::Lambda | NodeKind::Other => self.walk_children(node, scope, sink),
        }
    }

    fn walk_children(&mut self, node: NodeId, scope: &mut ExecutionScope, sink: &mut dyn ProblemSink) {
        let tree = self.tree;
        for &child in tree.children(node) {
            self.walk(child, scope, sink);
        }
    }

    fn visit_declaration(
        &mut self,
        node: NodeId,
        kind: DeclarationKind,
        scope: &mut ExecutionScope,
        sink: &mut dyn ProblemSink,
    ) {
        let declaration = self.declaration(node, kind);
        self.registry.register(declaration);
        scope.note_declaration(node);

        if scope.is_configuration() && self.is_speculative_candidate(node, declaration.kind) {
            self.ensure_analyzed(declaration);
            return;
        }
        self.walk_children(node, scope, sink);
    }

    fn visit_call(&mut self, node: NodeId, scope: &mut ExecutionScope, sink: &mut dyn ProblemSink) {
        if scope.is_configuration() {
            if let Some(body) = self.execution_block_body(node) {
                let tree = self.tree;
                for &child in tree.children(node).iter().filter(|&&c| c != body) {
                    self.walk(child, scope, sink);
                }
                debug!(
                    call = %node,
                    line = tree.line(node),
                    name = tree.callee(node).and_then(|c| tree.name(c)).unwrap_or_default(),
                    "entering execution block"
                );
                self.stats.execution_blocks += 1;
                let mut inner = ExecutionScope::real();
                self.walk(body, &mut inner, sink);
                return;
            }
        }
        self.walk_children(node, scope, sink);
        self.visit_reference(node, scope, sink);
    }

    fn visit_reference(&mut self, node: NodeId, scope: &ExecutionScope, sink: &mut dyn ProblemSink) {
        if scope.is_configuration() || sink.is_reported(node) {
            return;
        }
        let target = self.oracle.resolve_reference(node);
        if let Some(declaration) = target.and_then(|target| self.pending_record(target)) {
            self.ensure_analyzed(declaration);
        }

        let problems = Classifier::new(self.tree, self.oracle, self.symbols).classify(
            node,
            target,
            scope,
            &self.registry,
        );
        self.stats.references_classified += 1;
        trace!(
            reference = %node,
            name = self.tree.name(node).unwrap_or_default(),
            problems = problems.len(),
            "classified reference"
        );
        registry::dispatch(self.tree, node, &problems, sink);
    }

    /// Analyze the body of a configuration-level callable as if it ran at
    /// execution time, storing what it finds on the declaration's record.
    fn ensure_analyzed(&mut self, declaration: Declaration) {
        let record = self.registry.register(declaration);
        if record.state != RecordState::Pending {
            return;
        }
        record.state = RecordState::InProgress;
        debug!(
            declaration = %declaration.node,
            name = self.tree.name(declaration.node).unwrap_or_default(),
            kind = ?declaration.kind,
            "analyzing declaration body speculatively"
        );

        let mut scope = ExecutionScope::potential(declaration.node);
        let mut sink = BufferedSink::new();
        self.walk_children(declaration.node, &mut scope, &mut sink);

        if let Some(record) = self.registry.get_mut(declaration.node) {
            record.absorb(sink.into_problems());
            record.state = RecordState::Analyzed;
        }
        self.stats.declarations_analyzed += 1;
    }

    fn declaration(&self, node: NodeId, kind: DeclarationKind) -> Declaration {
        let root = self.tree.root();
        let scope = match self.tree.parent(node) {
            Some(parent) if parent == root => EnclosingScope::TopLevel,
            _ => EnclosingScope::Nested,
        };
        Declaration { node, kind, scope }
    }

    /// A declaration referenced before the walk reached it, whose body
    /// must be analyzed now so its problems can bubble.
    fn pending_record(&self, target: NodeId) -> Option<Declaration> {
        if self.registry.state(target) != RecordState::Pending {
            return None;
        }
        let declaration = self.declaration(target, self.tree.kind(target).declaration()?);
        if !self.is_speculative_candidate(target, declaration.kind) {
            return None;
        }
        let configuration_level = match declaration.scope {
            EnclosingScope::TopLevel => true,
            EnclosingScope::Nested => self.is_configuration_level(target),
        };
        configuration_level.then_some(declaration)
    }

    /// Functions and properties whose value is a lambda.
    fn is_speculative_candidate(&self, node: NodeId, kind: DeclarationKind) -> bool {
        match kind {
            DeclarationKind::Function => true,
            DeclarationKind::LocalVariable | DeclarationKind::Property => {
                self.is_lambda_valued(node)
            }
            DeclarationKind::Parameter | DeclarationKind::Class => false,
        }
    }

    fn is_lambda_valued(&self, declaration: NodeId) -> bool {
        let Some(initializer) = self.tree.initializer(declaration) else {
            return false;
        };
        match self.tree.kind(initializer) {
            NodeKind::Lambda => true,
            // `Runnable { ... }`
            NodeKind::Call => {
                self.tree.trailing_lambda(initializer).is_some()
                    && self
                        .oracle
                        .resolve_callable(initializer)
                        .is_some_and(|callable| callable.kind == CallableKind::Constructor)
            }
            _ => false,
        }
    }

    /// Whether a walk from the root would reach `node` in configuration scope.
    fn is_configuration_level(&self, node: NodeId) -> bool {
        for ancestor in self.tree.ancestors(node) {
            match self.tree.kind(ancestor) {
                NodeKind::Declaration(kind) if self.is_speculative_candidate(ancestor, kind) => {
                    return false;
                }
                NodeKind::Lambda => {
                    let in_block = self
                        .tree
                        .parent(ancestor)
                        .filter(|&call| self.tree.kind(call) == NodeKind::Call)
                        .and_then(|call| self.execution_block_body(call))
                        == Some(ancestor);
                    if in_block {
                        return false;
                    }
                }
                _ => {}
            }
        }
        true
    }

    /// The deferred body of `doLast { }`-style calls on a task receiver.
    fn execution_block_body(&self, call: NodeId) -> Option<NodeId> {
        let callee = self.tree.callee(call)?;
        let name = self.tree.name(callee)?;
        if !self.symbols.is_execution_block(name) {
            return None;
        }
        let body = self.tree.trailing_lambda(call)?;
        // `doLast { }` or the named form `doLast("name") { }`
        let arguments = self
            .tree
            .children(call)
            .iter()
            .filter(|&&child| child != callee && child != body)
            .count();
        if arguments > 1 {
            return None;
        }
        let receiver = self.oracle.resolve_receiver_type(callee)?;
        self.symbols.is_task_like(&receiver).then_some(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{CallableDescriptor, TypeDescriptor};
    use crate::testing::{MockOracle, MockTree};
    use pretty_assertions::assert_eq;

    const TASK: &str = "org.gradle.api.Task";

    /// `tasks.register("t") { <config>; doLast { <body> } }` with the
    /// register lambda returned for further building.
    fn task_with_do_last(tree: &mut MockTree, oracle: &mut MockOracle) -> (NodeId, NodeId) {
        let root = tree.root_id();
        let register = tree.call(root, 1);
        tree.name_ref(register, "register", 1);
        let config = tree.lambda(register, 1);
        let do_last = tree.call(config, 2);
        let callee = tree.name_ref(do_last, "doLast", 2);
        let body = tree.lambda(do_last, 2);
        oracle.receiver(callee, TypeDescriptor::new(TASK));
        (config, body)
    }

    fn run(tree: &MockTree, oracle: &MockOracle) -> (Vec<Diagnostic>, AnalysisStats) {
        Walker::new(tree, oracle, UnsupportedSymbols::builtin()).run()
    }

    #[test]
    fn top_level_value_in_execution_block_is_reported_once() {
        let mut tree = MockTree::new();
        let mut oracle = MockOracle::default();
        let root = tree.root_id();
        let my_var = tree.declaration(root, DeclarationKind::Property, "myVar", 1);
        let (_, body) = task_with_do_last(&mut tree, &mut oracle);
        let println = tree.call(body, 3);
        tree.name_ref(println, "println", 3);
        let usage = tree.name_ref(println, "myVar", 3);
        oracle.reference(usage, my_var);
        oracle.receiver(usage, TypeDescriptor::new("Build_gradle"));

        let (diagnostics, stats) = run(&tree, &oracle);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].span, Some(tree.span_of(usage)));
        assert_eq!(diagnostics[0].code.as_deref(), Some("script-object-reference"));
        assert_eq!(stats.execution_blocks, 1);
    }

    #[test]
    fn names_declared_in_the_block_are_safe() {
        let mut tree = MockTree::new();
        let mut oracle = MockOracle::default();
        let (_, body) = task_with_do_last(&mut tree, &mut oracle);
        let thread = tree.declaration(body, DeclarationKind::LocalVariable, "thread", 3);
        oracle.declared(thread, TypeDescriptor::new("java.lang.Thread"));
        let usage = tree.name_ref(body, "thread", 4);
        oracle.reference(usage, thread);

        let (diagnostics, _) = run(&tree, &oracle);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn unserializable_local_outside_the_block_is_reported() {
        let mut tree = MockTree::new();
        let mut oracle = MockOracle::default();
        let (config, body) = task_with_do_last(&mut tree, &mut oracle);
        let thread = tree.declaration(config, DeclarationKind::LocalVariable, "thread", 1);
        oracle.declared(
            thread,
            TypeDescriptor::new("java.lang.Thread").with_supertypes(["java.lang.Runnable"]),
        );
        let usage = tree.name_ref(body, "thread", 3);
        oracle.reference(usage, thread);

        let (diagnostics, _) = run(&tree, &oracle);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("'java.lang.Thread'"));
    }

    #[test]
    fn task_accessor_is_potential() {
        let mut tree = MockTree::new();
        let mut oracle = MockOracle::default();
        let (_, body) = task_with_do_last(&mut tree, &mut oracle);
        let usage = tree.name_ref(body, "project", 3);
        oracle.receiver(usage, TypeDescriptor::new(TASK));
        oracle.callable(usage, CallableDescriptor::getter("getProject"));
        oracle.ty(usage, TypeDescriptor::new("org.gradle.api.Project"));

        let (diagnostics, _) = run(&tree, &oracle);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .message
            .starts_with("Invocation of 'Task.project' by task at execution time is unsupported."));
        assert!(diagnostics[0].message.contains(crate::problem::POTENTIAL_FOOTER));
    }

    #[test]
    fn forward_referenced_function_bubbles_to_call_site() {
        let mut tree = MockTree::new();
        let mut oracle = MockOracle::default();
        let (config, body) = task_with_do_last(&mut tree, &mut oracle);
        let call = tree.call(body, 3);
        let callee = tree.name_ref(call, "helper", 3);

        // declared after the block that uses it
        let helper = tree.declaration(config, DeclarationKind::Function, "helper", 5);
        let build_dir = tree.name_ref(helper, "buildDir", 6);
        oracle.receiver(build_dir, TypeDescriptor::new("Build_gradle"));
        oracle.reference(callee, helper);

        let (diagnostics, stats) = run(&tree, &oracle);
        assert_eq!(stats.declarations_analyzed, 1);
        assert_eq!(diagnostics.len(), 2);
        let at_origin = diagnostics
            .iter()
            .find(|d| d.span == Some(tree.span_of(build_dir)))
            .unwrap();
        assert!(at_origin.message.ends_with("At line: 3"));
        let at_call = diagnostics
            .iter()
            .find(|d| d.span == Some(tree.span_of(callee)))
            .unwrap();
        assert!(at_call.message.ends_with("At line: 6"));
    }

    #[test]
    fn function_never_called_at_execution_time_is_silent() {
        let mut tree = MockTree::new();
        let mut oracle = MockOracle::default();
        let root = tree.root_id();
        let helper = tree.declaration(root, DeclarationKind::Function, "helper", 1);
        let build_dir = tree.name_ref(helper, "buildDir", 2);
        oracle.receiver(build_dir, TypeDescriptor::new("Build_gradle"));
        let call = tree.call(root, 4);
        let callee = tree.name_ref(call, "helper", 4);
        oracle.reference(callee, helper);

        let (diagnostics, stats) = run(&tree, &oracle);
        assert!(diagnostics.is_empty());
        assert_eq!(stats.declarations_analyzed, 1);
    }

    #[test]
    fn lambda_valued_property_is_analyzed_speculatively() {
        let mut tree = MockTree::new();
        let mut oracle = MockOracle::default();
        let root = tree.root_id();
        let action = tree.declaration(root, DeclarationKind::Property, "action", 1);
        let value = tree.lambda(action, 1);
        tree.set_initializer(action, value);
        let layout = tree.name_ref(value, "layout", 2);
        oracle.receiver(layout, TypeDescriptor::new("Build_gradle"));

        let (_, body) = task_with_do_last(&mut tree, &mut oracle);
        let call = tree.call(body, 5);
        let callee = tree.name_ref(call, "action", 5);
        oracle.reference(callee, action);
        // `action` itself is a member of the script object
        oracle.receiver(callee, TypeDescriptor::new("Build_gradle"));

        let (diagnostics, stats) = run(&tree, &oracle);
        assert_eq!(stats.declarations_analyzed, 1);
        let spans: Vec<_> = diagnostics.iter().filter_map(|d| d.span).collect();
        assert_eq!(spans, vec![tree.span_of(layout), tree.span_of(callee)]);
        // the local problem wins at the reference itself
        assert!(!diagnostics[1].message.contains("At line:"));
    }

    #[test]
    fn declarations_inside_execution_blocks_are_not_speculated() {
        let mut tree = MockTree::new();
        let mut oracle = MockOracle::default();
        let (_, body) = task_with_do_last(&mut tree, &mut oracle);
        let helper = tree.declaration(body, DeclarationKind::Function, "helper", 3);
        let layout = tree.name_ref(helper, "layout", 4);
        oracle.receiver(layout, TypeDescriptor::new("Build_gradle"));
        let call = tree.call(body, 6);
        let callee = tree.name_ref(call, "helper", 6);
        oracle.reference(callee, helper);

        let (diagnostics, stats) = run(&tree, &oracle);
        assert_eq!(stats.declarations_analyzed, 0);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].span, Some(tree.span_of(layout)));
    }

    #[test]
    fn named_execution_block_is_deferred() {
        let mut tree = MockTree::new();
        let mut oracle = MockOracle::default();
        let root = tree.root_id();
        let register = tree.call(root, 1);
        tree.name_ref(register, "register", 1);
        let config = tree.lambda(register, 1);

        // doLast("print layout") { println(layout) }
        let named = tree.call(config, 2);
        let callee = tree.name_ref(named, "doLast", 2);
        tree.other(named, 2);
        let body = tree.lambda(named, 2);
        oracle.receiver(callee, TypeDescriptor::new(TASK));
        let layout = tree.name_ref(body, "layout", 3);
        oracle.receiver(layout, TypeDescriptor::new("Build_gradle"));

        // two leading arguments is not an execution block
        let odd = tree.call(config, 5);
        let odd_callee = tree.name_ref(odd, "doLast", 5);
        tree.other(odd, 5);
        tree.other(odd, 5);
        let odd_body = tree.lambda(odd, 5);
        oracle.receiver(odd_callee, TypeDescriptor::new(TASK));
        let ignored = tree.name_ref(odd_body, "layout", 6);
        oracle.receiver(ignored, TypeDescriptor::new("Build_gradle"));

        let (diagnostics, stats) = run(&tree, &oracle);
        assert_eq!(stats.execution_blocks, 1);
        let spans: Vec<_> = diagnostics.iter().filter_map(|d| d.span).collect();
        assert_eq!(spans, vec![tree.span_of(layout)]);
    }

    #[test]
    fn declarations_know_their_enclosing_scope() {
        let mut tree = MockTree::new();
        let oracle = MockOracle::default();
        let root = tree.root_id();
        let helper = tree.declaration(root, DeclarationKind::Function, "helper", 1);
        let inner = tree.declaration(helper, DeclarationKind::LocalVariable, "inner", 2);

        let walker = Walker::new(&tree, &oracle, UnsupportedSymbols::builtin());
        let top = walker.declaration(helper, DeclarationKind::Function);
        assert_eq!(top.scope, EnclosingScope::TopLevel);
        let nested = walker.declaration(inner, DeclarationKind::LocalVariable);
        assert_eq!(nested.scope, EnclosingScope::Nested);
        assert_eq!(walker.pending_record(helper), Some(top));
        // locals are never analyzed ahead of the walk
        assert_eq!(walker.pending_record(inner), None);
    }

    #[test]
    fn error_nodes_do_not_stop_the_walk() {
        let mut tree = MockTree::new();
        let mut oracle = MockOracle::default();
        let root = tree.root_id();
        tree.error(root, 1);
        let (_, body) = task_with_do_last(&mut tree, &mut oracle);
        let usage = tree.name_ref(body, "layout", 3);
        oracle.receiver(usage, TypeDescriptor::new("Build_gradle"));

        let (diagnostics, stats) = run(&tree, &oracle);
        assert_eq!(stats.skipped_nodes, 1);
        assert_eq!(diagnostics.len(), 1);
    }
}
