//! Arena syntax tree produced by the parser.

use ccl_core::span::{SourceFile, Span};
use ccl_core::syntax::{DeclarationKind, NodeId, NodeKind, SyntaxTree};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Equality,
    Comparison,
    Is,
    In,
    Elvis,
    Range,
    Additive,
    Multiplicative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixOp {
    Not,
    Minus,
    Plus,
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    String,
    Integer,
    Long,
    Double,
    Float,
    Char,
    Boolean,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    File,
    Import,
    Property { mutable: bool, local: bool },
    Function,
    /// `class`, `object` and `interface` declarations.
    Class,
    /// `property` is set for `val`/`var` constructor parameters.
    Parameter { property: bool },
    TypeRef { nullable: bool },
    Block,
    Lambda,
    Call,
    NameRef,
    DotQualified,
    SafeQualified,
    Index,
    NotNull,
    StringTemplate,
    Literal(LiteralKind),
    Binary(BinaryOp),
    Prefix(PrefixOp),
    Cast { safe: bool },
    Paren,
    If,
    Return,
    Throw,
    Assignment,
    This,
    Error,
}

/// Children with a fixed role, kept alongside the ordered child list.
#[derive(Debug, Clone, Default)]
pub struct Slots {
    /// Declared type, or a function's return type.
    pub type_ref: Option<NodeId>,
    /// Extension receiver of a function.
    pub receiver: Option<NodeId>,
    /// Initializer, default value or function body.
    pub value: Option<NodeId>,
    pub callee: Option<NodeId>,
    pub lambda: Option<NodeId>,
    pub type_arguments: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: SyntaxKind,
    pub span: Span,
    pub line: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub name: Option<String>,
    pub slots: Slots,
}

#[derive(Debug, Clone)]
pub struct ScriptTree {
    nodes: Vec<Node>,
    root: NodeId,
    file: SourceFile,
}

impl ScriptTree {
    pub(crate) fn new(file: SourceFile) -> Self {
        Self {
            nodes: Vec::new(),
            root: NodeId(0),
            file,
        }
    }

    pub(crate) fn alloc(
        &mut self,
        kind: SyntaxKind,
        lo: usize,
        hi: usize,
        children: Vec<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let span = Span::new(self.file.id, lo as u32, hi as u32);
        self.nodes.push(Node {
            kind,
            span,
            line: self.file.line_of(lo as u32),
            parent: None,
            children,
            name: None,
            slots: Slots::default(),
        });
        id
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Set the root and link every reachable node to its parent.
    pub(crate) fn finish(&mut self, root: NodeId) {
        self.root = root;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let children = self.nodes[node.index()].children.clone();
            for child in children {
                self.nodes[child.index()].parent = Some(node);
                stack.push(child);
            }
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn syntax_kind(&self, id: NodeId) -> SyntaxKind {
        self.nodes[id.index()].kind
    }

    pub fn slots(&self, id: NodeId) -> &Slots {
        &self.nodes[id.index()].slots
    }

    pub fn file(&self) -> &SourceFile {
        &self.file
    }

    pub fn text(&self, id: NodeId) -> &str {
        let span = self.nodes[id.index()].span;
        self.file.snippet(span).unwrap_or_default()
    }

    /// Nodes reachable from the root in pre-order.
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.nodes[node.index()].children.iter().rev());
        }
        order
    }

    pub fn find_by_text(&self, kind: SyntaxKind, text: &str) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|&id| self.syntax_kind(id) == kind && self.text(id) == text)
            .collect()
    }

    /// Indented outline of the tree, one node per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(self.root, 0, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        let _ = write!(out, "{:indent$}{:?}", "", node.kind, indent = depth * 2);
        if let Some(name) = &node.name {
            let _ = write!(out, " {}", name);
        }
        out.push('\n');
        for &child in &node.children {
            self.dump_node(child, depth + 1, out);
        }
    }
}

impl SyntaxTree for ScriptTree {
    fn root(&self) -> NodeId {
        self.root
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        match self.syntax_kind(node) {
            SyntaxKind::Property { local: true, .. } => {
                NodeKind::Declaration(DeclarationKind::LocalVariable)
            }
            SyntaxKind::Property { local: false, .. } => {
                NodeKind::Declaration(DeclarationKind::Property)
            }
            SyntaxKind::Function => NodeKind::Declaration(DeclarationKind::Function),
            SyntaxKind::Class => NodeKind::Declaration(DeclarationKind::Class),
            SyntaxKind::Parameter { .. } => NodeKind::Declaration(DeclarationKind::Parameter),
            SyntaxKind::Call => NodeKind::Call,
            SyntaxKind::NameRef => NodeKind::NameReference,
            SyntaxKind::Lambda => NodeKind::Lambda,
            SyntaxKind::Error => NodeKind::Error,
            _ => NodeKind::Other,
        }
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.index()].children
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    fn span(&self, node: NodeId) -> Span {
        self.nodes[node.index()].span
    }

    fn line(&self, node: NodeId) -> usize {
        self.nodes[node.index()].line
    }

    fn name(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.index()].name.as_deref()
    }

    fn callee(&self, call: NodeId) -> Option<NodeId> {
        self.slots(call).callee
    }

    fn trailing_lambda(&self, call: NodeId) -> Option<NodeId> {
        self.slots(call).lambda
    }

    fn initializer(&self, declaration: NodeId) -> Option<NodeId> {
        match self.syntax_kind(declaration) {
            SyntaxKind::Property { .. } => self.slots(declaration).value,
            _ => None,
        }
    }
}
