//! The view of a parsed build script that the analyzer walks.
//!
//! The tree itself is owned by the host front end; the analyzer only
//! navigates it through [`SyntaxTree`] and never mutates it.

use crate::span::Span;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Opaque handle to a node of a host syntax tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("#{_0}")]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Function,
    /// `val`/`var` declared inside a function, lambda or block body.
    LocalVariable,
    /// `val`/`var` declared at top level or as a class member.
    Property,
    Parameter,
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Declaration(DeclarationKind),
    /// A call expression; also a reference in its own right.
    Call,
    NameReference,
    Lambda,
    Other,
    /// A node the host could not parse.
    Error,
}

impl NodeKind {
    pub fn is_reference(self) -> bool {
        matches!(self, NodeKind::Call | NodeKind::NameReference)
    }

    pub fn declaration(self) -> Option<DeclarationKind> {
        match self {
            NodeKind::Declaration(kind) => Some(kind),
            _ => None,
        }
    }
}

pub trait SyntaxTree {
    fn root(&self) -> NodeId;

    fn kind(&self, node: NodeId) -> NodeKind;

    fn children(&self, node: NodeId) -> &[NodeId];

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn span(&self, node: NodeId) -> Span;

    /// 1-based line on which `node` starts.
    fn line(&self, node: NodeId) -> usize;

    /// Identifier of a declaration or name reference.
    fn name(&self, node: NodeId) -> Option<&str>;

    fn callee(&self, call: NodeId) -> Option<NodeId>;

    /// The lambda passed as the last argument of `call`, if any.
    fn trailing_lambda(&self, call: NodeId) -> Option<NodeId>;

    fn initializer(&self, declaration: NodeId) -> Option<NodeId>;

    fn enclosing_declaration(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if matches!(self.kind(parent), NodeKind::Declaration(_)) {
                return Some(parent);
            }
            current = self.parent(parent);
        }
        None
    }

    fn ancestors(&self, node: NodeId) -> Ancestors<'_, Self>
    where
        Self: Sized,
    {
        Ancestors {
            tree: self,
            next: self.parent(node),
        }
    }
}

pub struct Ancestors<'a, T: SyntaxTree> {
    tree: &'a T,
    next: Option<NodeId>,
}

impl<T: SyntaxTree> Iterator for Ancestors<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
