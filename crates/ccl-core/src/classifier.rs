//! Per-reference rules deciding whether a reference made at execution time
//! captures state the configuration cache cannot serialize.

use crate::oracle::SemanticOracle;
use crate::problem::Problem;
use crate::scope::{DeclarationRegistry, ExecutionScope};
use crate::syntax::{DeclarationKind, NodeId, NodeKind, SyntaxTree};
use crate::tables::UnsupportedSymbols;

pub struct Classifier<'a, T: ?Sized, O: ?Sized> {
    tree: &'a T,
    oracle: &'a O,
    symbols: &'a UnsupportedSymbols,
}

impl<'a, T, O> Classifier<'a, T, O>
where
    T: SyntaxTree + ?Sized,
    O: SemanticOracle + ?Sized,
{
    pub fn new(tree: &'a T, oracle: &'a O, symbols: &'a UnsupportedSymbols) -> Self {
        Self {
            tree,
            oracle,
            symbols,
        }
    }

    /// Problems for `reference` in priority order. `target` is the
    /// declaration the reference resolved to, if any.
    pub fn classify(
        &self,
        reference: NodeId,
        target: Option<NodeId>,
        scope: &ExecutionScope,
        registry: &DeclarationRegistry,
    ) -> Vec<Problem> {
        let mut problems = Vec::new();
        if scope.is_configuration() {
            return problems;
        }

        problems.extend(self.receiver_problem(reference));

        if let Some(target) = target {
            if scope.declares(target) {
                return problems;
            }
            match self.unserializable_local(reference, target) {
                Some(problem) => problems.push(problem),
                None => problems.extend(registry.problems_of(target).iter().cloned()),
            }
        }

        problems.extend(self.forbidden_type(reference));
        problems
    }

    fn receiver_problem(&self, reference: NodeId) -> Option<Problem> {
        let receiver = self.oracle.resolve_receiver_type(reference)?;
        if self.symbols.is_script_type(&receiver) {
            return Some(Problem::script_object_reference(reference));
        }
        if self.symbols.is_task_like(&receiver) {
            let callable = self.oracle.resolve_callable(reference)?;
            if callable.value_parameters == 0 && self.symbols.is_unsupported_accessor(&callable.name)
            {
                return Some(Problem::unsupported_task_accessor(
                    reference,
                    &callable.display_name(),
                ));
            }
        }
        None
    }

    fn unserializable_local(&self, reference: NodeId, target: NodeId) -> Option<Problem> {
        if self.tree.kind(target) != NodeKind::Declaration(DeclarationKind::LocalVariable) {
            return None;
        }
        let declared = self.oracle.declared_type(target)?;
        self.symbols.unserializable_match(&declared)?;
        Some(Problem::unserializable_local(reference, &declared.fq_name))
    }

    fn forbidden_type(&self, reference: NodeId) -> Option<Problem> {
        let ty = self.oracle.resolve_type(reference)?;
        if !self.symbols.is_forbidden_expression_type(&ty) {
            return None;
        }
        Some(Problem::non_serializable_type(reference, &ty.fq_name, ty.nullable))
    }
}
