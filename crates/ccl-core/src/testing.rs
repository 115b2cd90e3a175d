//! In-memory host used by unit tests: nodes are appended under a parent and
//! every semantic fact is recorded explicitly.

use crate::oracle::{CallableDescriptor, SemanticOracle, TypeDescriptor};
use crate::span::Span;
use crate::syntax::{DeclarationKind, NodeId, NodeKind, SyntaxTree};
use std::collections::HashMap;

struct MockNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    name: Option<String>,
    line: usize,
    callee: Option<NodeId>,
    trailing_lambda: Option<NodeId>,
    initializer: Option<NodeId>,
}

pub struct MockTree {
    nodes: Vec<MockNode>,
}

impl MockTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![MockNode {
                kind: NodeKind::Other,
                parent: None,
                children: Vec::new(),
                name: None,
                line: 1,
                callee: None,
                trailing_lambda: None,
                initializer: None,
            }],
        }
    }

    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind, name: Option<&str>, line: usize) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(MockNode {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            name: name.map(str::to_string),
            line,
            callee: None,
            trailing_lambda: None,
            initializer: None,
        });
        self.nodes[parent.index()].children.push(id);

        // first name under a call is its callee, a lambda under it is trailing
        let parent_node = &mut self.nodes[parent.index()];
        if parent_node.kind == NodeKind::Call {
            match kind {
                NodeKind::NameReference if parent_node.callee.is_none() => {
                    parent_node.callee = Some(id)
                }
                NodeKind::Lambda => parent_node.trailing_lambda = Some(id),
                _ => {}
            }
        }
        id
    }

    pub fn declaration(&mut self, parent: NodeId, kind: DeclarationKind, name: &str, line: usize) -> NodeId {
        self.push(parent, NodeKind::Declaration(kind), Some(name), line)
    }

    pub fn call(&mut self, parent: NodeId, line: usize) -> NodeId {
        self.push(parent, NodeKind::Call, None, line)
    }

    pub fn name_ref(&mut self, parent: NodeId, name: &str, line: usize) -> NodeId {
        self.push(parent, NodeKind::NameReference, Some(name), line)
    }

    pub fn lambda(&mut self, parent: NodeId, line: usize) -> NodeId {
        self.push(parent, NodeKind::Lambda, None, line)
    }

    /// Any expression the walker only descends through, such as a literal.
    pub fn other(&mut self, parent: NodeId, line: usize) -> NodeId {
        self.push(parent, NodeKind::Other, None, line)
    }

    pub fn error(&mut self, parent: NodeId, line: usize) -> NodeId {
        self.push(parent, NodeKind::Error, None, line)
    }

    pub fn set_initializer(&mut self, declaration: NodeId, initializer: NodeId) {
        self.nodes[declaration.index()].initializer = Some(initializer);
    }

    /// Spans are synthetic: one unit per node, ordered by creation.
    pub fn span_of(&self, node: NodeId) -> Span {
        Span::new(0, node.0 * 10, node.0 * 10 + 5)
    }
}

impl SyntaxTree for MockTree {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        self.nodes[node.index()].kind
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.index()].children
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    fn span(&self, node: NodeId) -> Span {
        self.span_of(node)
    }

    fn line(&self, node: NodeId) -> usize {
        self.nodes[node.index()].line
    }

    fn name(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.index()].name.as_deref()
    }

    fn callee(&self, call: NodeId) -> Option<NodeId> {
        self.nodes[call.index()].callee
    }

    fn trailing_lambda(&self, call: NodeId) -> Option<NodeId> {
        self.nodes[call.index()].trailing_lambda
    }

    fn initializer(&self, declaration: NodeId) -> Option<NodeId> {
        self.nodes[declaration.index()].initializer
    }
}

#[derive(Default)]
pub struct MockOracle {
    references: HashMap<NodeId, NodeId>,
    types: HashMap<NodeId, TypeDescriptor>,
    receivers: HashMap<NodeId, TypeDescriptor>,
    callables: HashMap<NodeId, CallableDescriptor>,
    declared: HashMap<NodeId, TypeDescriptor>,
}

impl MockOracle {
    pub fn reference(&mut self, node: NodeId, target: NodeId) {
        self.references.insert(node, target);
    }

    pub fn ty(&mut self, node: NodeId, ty: TypeDescriptor) {
        self.types.insert(node, ty);
    }

    pub fn receiver(&mut self, node: NodeId, ty: TypeDescriptor) {
        self.receivers.insert(node, ty);
    }

    pub fn callable(&mut self, node: NodeId, callable: CallableDescriptor) {
        self.callables.insert(node, callable);
    }

    pub fn declared(&mut self, declaration: NodeId, ty: TypeDescriptor) {
        self.declared.insert(declaration, ty);
    }
}

impl SemanticOracle for MockOracle {
    fn resolve_reference(&self, node: NodeId) -> Option<NodeId> {
        self.references.get(&node).copied()
    }

    fn resolve_type(&self, node: NodeId) -> Option<TypeDescriptor> {
        self.types.get(&node).cloned()
    }

    fn resolve_receiver_type(&self, node: NodeId) -> Option<TypeDescriptor> {
        self.receivers.get(&node).cloned()
    }

    fn resolve_callable(&self, node: NodeId) -> Option<CallableDescriptor> {
        self.callables.get(&node).cloned()
    }

    fn declared_type(&self, declaration: NodeId) -> Option<TypeDescriptor> {
        self.declared.get(&declaration).cloned()
    }
}
