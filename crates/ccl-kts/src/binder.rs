//! Name and type resolution for a parsed script.
//!
//! A collection pass indexes in-file classes and their members so forward
//! references resolve; a single binding walk then resolves every name and
//! call against a stack of lexical frames and records what it found. The
//! result answers the analyzer's [`SemanticOracle`] queries.

use crate::model::{default_getter, split_nullable, ApiModel, FunctionSpec, ANY, SELF_TYPE, UNIT};
use crate::tree::{BinaryOp, LiteralKind, PrefixOp, ScriptTree, SyntaxKind};
use ccl_core::oracle::{CallableDescriptor, CallableKind, SemanticOracle, TypeDescriptor};
use ccl_core::syntax::{NodeId, SyntaxTree};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Per-node facts recorded by the binder.
#[derive(Debug, Clone, Default)]
pub struct SemanticModel {
    references: HashMap<NodeId, NodeId>,
    types: HashMap<NodeId, TypeDescriptor>,
    receivers: HashMap<NodeId, TypeDescriptor>,
    callables: HashMap<NodeId, CallableDescriptor>,
    declared: HashMap<NodeId, TypeDescriptor>,
}

impl SemanticModel {
    pub fn bind(tree: &ScriptTree, api: &ApiModel) -> Self {
        let mut binder = Binder::new(tree, api);
        binder.collect();
        binder.bind(tree.root());
        debug!(
            references = binder.model.references.len(),
            types = binder.model.types.len(),
            classes = binder.classes.len(),
            "bound script"
        );
        binder.model
    }

    pub fn bind_builtin(tree: &ScriptTree) -> Self {
        Self::bind(tree, ApiModel::builtin())
    }
}

impl SemanticOracle for SemanticModel {
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

/// A class of the script, or the script itself.
#[derive(Debug)]
struct ClassInfo {
    fq_name: String,
    members: HashMap<String, Vec<NodeId>>,
    /// Supertype names as written.
    supertypes: Vec<(String, bool)>,
}

#[derive(Debug, Default)]
struct Frame {
    locals: HashMap<String, NodeId>,
    receiver: Option<TypeDescriptor>,
    /// Set in lambdas without explicit parameters.
    implicit_it: bool,
    it_type: Option<TypeDescriptor>,
}

#[derive(Debug, Clone, Default)]
struct LambdaContext {
    receiver: Option<TypeDescriptor>,
    parameter: Option<TypeDescriptor>,
}

#[derive(Debug, Default)]
struct Resolution {
    target: Option<NodeId>,
    receiver: Option<TypeDescriptor>,
    callable: Option<CallableDescriptor>,
    ty: Option<TypeDescriptor>,
    lambda: LambdaContext,
}

/// Where a member name is looked up.
enum Lookup {
    /// Through the enclosing frames.
    Implicit,
    /// After `.`; `None` when the receiver's type is unknown.
    Explicit(Option<TypeDescriptor>),
}

struct Binder<'a> {
    tree: &'a ScriptTree,
    api: &'a ApiModel,
    classes: HashMap<NodeId, ClassInfo>,
    by_fq: HashMap<String, NodeId>,
    by_simple: HashMap<String, NodeId>,
    frames: Vec<Frame>,
    lambdas: HashMap<NodeId, LambdaContext>,
    model: SemanticModel,
}

impl<'a> Binder<'a> {
    fn new(tree: &'a ScriptTree, api: &'a ApiModel) -> Self {
        Self {
            tree,
            api,
            classes: HashMap::new(),
            by_fq: HashMap::new(),
            by_simple: HashMap::new(),
            frames: Vec::new(),
            lambdas: HashMap::new(),
            model: SemanticModel::default(),
        }
    }

    // ---- collection ---------------------------------------------------

    fn collect(&mut self) {
        let tree = self.tree;
        let root = tree.root();
        let script = self.api.script_type().to_string();
        self.register_class(root, script);

        for node in tree.descendants() {
            if tree.syntax_kind(node) != SyntaxKind::Class {
                continue;
            }
            let owner = self.owner_class(node);
            let owner_fq = self
                .classes
                .get(&owner)
                .map(|info| info.fq_name.clone())
                .unwrap_or_default();
            let fq_name = match tree.name(node) {
                Some(name) => format!("{owner_fq}.{name}"),
                None => format!("{owner_fq}.<anonymous {node}>"),
            };
            if let Some(name) = tree.name(node) {
                self.by_simple.entry(name.to_string()).or_insert(node);
            }
            self.register_class(node, fq_name);
        }

        // explicit types are known before any expression is bound
        for node in tree.descendants() {
            let declared = match tree.syntax_kind(node) {
                SyntaxKind::Property { .. } | SyntaxKind::Parameter { .. } => {
                    tree.slots(node).type_ref.map(|ty| self.type_ref(ty))
                }
                SyntaxKind::Function => match tree.slots(node).type_ref {
                    Some(ty) => Some(self.type_ref(ty)),
                    None => match tree.slots(node).value {
                        Some(body) if tree.syntax_kind(body) != SyntaxKind::Block => None,
                        _ => Some(self.api.descriptor(UNIT)),
                    },
                },
                SyntaxKind::Class => self
                    .classes
                    .get(&node)
                    .map(|info| info.fq_name.clone())
                    .map(|fq| self.class_descriptor(&fq, false)),
                _ => None,
            };
            if let Some(ty) = declared {
                self.model.declared.insert(node, ty);
            }
        }
    }

    fn register_class(&mut self, node: NodeId, fq_name: String) {
        let tree = self.tree;
        let mut members: HashMap<String, Vec<NodeId>> = HashMap::new();
        let mut supertypes = Vec::new();
        for &child in tree.children(node) {
            match tree.syntax_kind(child) {
                SyntaxKind::Property { .. }
                | SyntaxKind::Function
                | SyntaxKind::Class
                | SyntaxKind::Parameter { property: true } => {
                    if let Some(name) = tree.name(child) {
                        members.entry(name.to_string()).or_default().push(child);
                    }
                }
                SyntaxKind::TypeRef { nullable } => {
                    if let Some(name) = tree.name(child) {
                        supertypes.push((name.to_string(), nullable));
                    }
                }
                _ => {}
            }
        }
        if node == tree.root() {
            supertypes = self
                .api
                .type_spec(&fq_name)
                .map(|spec| spec.supertypes.iter().map(|s| (s.clone(), false)).collect())
                .unwrap_or_default();
        }
        self.by_fq.insert(fq_name.clone(), node);
        self.classes.insert(
            node,
            ClassInfo {
                fq_name,
                members,
                supertypes,
            },
        );
    }

    /// Nearest enclosing class, or the root for top-level classes.
    fn owner_class(&self, node: NodeId) -> NodeId {
        self.tree
            .ancestors(node)
            .find(|&ancestor| self.classes.contains_key(&ancestor))
            .unwrap_or_else(|| self.tree.root())
    }

    // ---- types --------------------------------------------------------

    fn qualify(&self, name: &str) -> String {
        if self.by_fq.contains_key(name) {
            return name.to_string();
        }
        if let Some(class) = self.by_simple.get(name) {
            if let Some(info) = self.classes.get(class) {
                return info.fq_name.clone();
            }
        }
        self.api
            .qualify(name)
            .map(str::to_string)
            .unwrap_or_else(|| name.to_string())
    }

    fn descriptor(&self, name: &str, nullable: bool) -> TypeDescriptor {
        let fq_name = self.qualify(name);
        if self.by_fq.contains_key(&fq_name) {
            self.class_descriptor(&fq_name, nullable)
        } else {
            self.api.descriptor(&fq_name).nullable(nullable)
        }
    }

    /// Model type name, possibly `Self` or nullable.
    fn model_type(&self, name: &str, this: Option<&TypeDescriptor>) -> Option<TypeDescriptor> {
        let (base, nullable) = split_nullable(name);
        if base == SELF_TYPE {
            return this.map(|ty| ty.clone().nullable(ty.nullable || nullable));
        }
        Some(self.descriptor(base, nullable))
    }

    fn class_descriptor(&self, fq_name: &str, nullable: bool) -> TypeDescriptor {
        let mut supertypes = Vec::new();
        let mut seen = HashSet::from([fq_name.to_string()]);
        let mut pending = vec![fq_name.to_string()];
        while let Some(current) = pending.pop() {
            let Some(info) = self.by_fq.get(&current).and_then(|n| self.classes.get(n)) else {
                continue;
            };
            for (name, _) in &info.supertypes {
                let parent = self.qualify(name);
                if !seen.insert(parent.clone()) {
                    continue;
                }
                supertypes.push(parent.clone());
                if self.by_fq.contains_key(&parent) {
                    pending.push(parent);
                } else {
                    for inherited in self.api.supertypes(&parent) {
                        if seen.insert(inherited.clone()) {
                            supertypes.push(inherited);
                        }
                    }
                }
            }
        }
        // keep `kotlin.Any` last
        supertypes.retain(|s| s != ANY);
        supertypes.push(ANY.to_string());
        TypeDescriptor::new(fq_name)
            .with_supertypes(supertypes)
            .nullable(nullable)
    }

    fn type_ref(&self, node: NodeId) -> TypeDescriptor {
        let name = self.tree.name(node).unwrap_or(ANY);
        let nullable = matches!(
            self.tree.syntax_kind(node),
            SyntaxKind::TypeRef { nullable: true }
        );
        self.descriptor(name, nullable)
    }

    fn literal_type(kind: LiteralKind) -> Option<&'static str> {
        match kind {
            LiteralKind::String => Some("kotlin.String"),
            LiteralKind::Integer => Some("kotlin.Int"),
            LiteralKind::Long => Some("kotlin.Long"),
            LiteralKind::Double => Some("kotlin.Double"),
            LiteralKind::Float => Some("kotlin.Float"),
            LiteralKind::Char => Some("kotlin.Char"),
            LiteralKind::Boolean => Some("kotlin.Boolean"),
            LiteralKind::Null => None,
        }
    }

    fn type_of(&self, node: NodeId) -> Option<TypeDescriptor> {
        self.model.types.get(&node).cloned()
    }

    fn set_type(&mut self, node: NodeId, ty: Option<TypeDescriptor>) {
        if let Some(ty) = ty {
            self.model.types.insert(node, ty);
        }
    }

    // ---- frames -------------------------------------------------------

    fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn declare_local(&mut self, node: NodeId) {
        let Some(name) = self.tree.name(node) else {
            return;
        };
        if let Some(frame) = self.frames.last_mut() {
            frame.locals.insert(name.to_string(), node);
        }
    }

    fn frame_with_parameters(&self, owner: NodeId, receiver: Option<TypeDescriptor>) -> Frame {
        let tree = self.tree;
        let locals = tree
            .children(owner)
            .iter()
            .filter(|&&child| matches!(tree.syntax_kind(child), SyntaxKind::Parameter { .. }))
            .filter_map(|&child| tree.name(child).map(|name| (name.to_string(), child)))
            .collect();
        Frame {
            locals,
            receiver,
            ..Frame::default()
        }
    }

    fn innermost_receiver(&self) -> Option<TypeDescriptor> {
        self.frames.iter().rev().find_map(|frame| frame.receiver.clone())
    }

    // ---- binding walk -------------------------------------------------

    fn bind_children(&mut self, node: NodeId) {
        let tree = self.tree;
        for &child in tree.children(node) {
            self.bind(child);
        }
    }

    fn bind(&mut self, node: NodeId) {
        let tree = self.tree;
        match tree.syntax_kind(node) {
            SyntaxKind::File => {
                let script = self.api.script_type().to_string();
                let receiver = self.class_descriptor(&script, false);
                self.push(Frame {
                    receiver: Some(receiver),
                    ..Frame::default()
                });
                self.bind_children(node);
                self.pop();
            }
            SyntaxKind::Class => {
                let receiver = self.declared(node);
                let frame = self.frame_with_parameters(node, receiver.clone());
                self.push(frame);
                self.bind_children(node);
                self.pop();
                // `object : Runnable { }` used as a value
                self.set_type(node, receiver);
            }
            SyntaxKind::Function => self.bind_function(node),
            SyntaxKind::Property { local, .. } => {
                // the initializer cannot see the name it initializes
                self.bind_children(node);
                if !self.model.declared.contains_key(&node) {
                    let inferred = tree.slots(node).value.and_then(|value| self.type_of(value));
                    if let Some(ty) = inferred {
                        self.model.declared.insert(node, ty);
                    }
                }
                if local {
                    self.declare_local(node);
                }
            }
            SyntaxKind::Block => {
                self.push(Frame::default());
                for &child in tree.children(node) {
                    match tree.syntax_kind(child) {
                        // loop variables and catch parameters
                        SyntaxKind::Parameter { .. } => {
                            self.bind(child);
                            self.declare_local(child);
                        }
                        _ => self.bind(child),
                    }
                }
                let last = tree.children(node).last().and_then(|&n| self.type_of(n));
                self.pop();
                self.set_type(node, last);
            }
            SyntaxKind::Lambda => self.bind_lambda(node),
            SyntaxKind::Call => self.bind_call(node, Lookup::Implicit),
            SyntaxKind::NameRef => {
                let resolution = self.resolve_name(node, &Lookup::Implicit);
                self.record(node, resolution);
            }
            SyntaxKind::DotQualified | SyntaxKind::SafeQualified => {
                let safe = tree.syntax_kind(node) == SyntaxKind::SafeQualified;
                let children = tree.children(node);
                let (Some(&left), Some(&selector)) = (children.first(), children.get(1)) else {
                    self.bind_children(node);
                    return;
                };
                self.bind(left);
                let receiver = self.type_of(left).map(|ty| ty.nullable(false));
                self.bind_selector(selector, receiver);
                let ty = self
                    .type_of(selector)
                    .map(|ty| if safe { ty.nullable(true) } else { ty });
                self.set_type(node, ty);
            }
            SyntaxKind::This => {
                let receiver = self.innermost_receiver();
                self.set_type(node, receiver);
            }
            SyntaxKind::Literal(kind) => {
                let ty = Self::literal_type(kind).map(|name| self.api.descriptor(name));
                self.set_type(node, ty);
            }
            SyntaxKind::StringTemplate => {
                self.bind_children(node);
                let ty = self.api.descriptor("kotlin.String");
                self.set_type(node, Some(ty));
            }
            SyntaxKind::Binary(op) => {
                self.bind_children(node);
                let children = tree.children(node);
                let left = children.first().and_then(|&n| self.type_of(n));
                let ty = match op {
                    BinaryOp::Or
                    | BinaryOp::And
                    | BinaryOp::Equality
                    | BinaryOp::Comparison
                    | BinaryOp::Is
                    | BinaryOp::In => Some(self.api.descriptor("kotlin.Boolean")),
                    BinaryOp::Elvis => left
                        .map(|ty| ty.nullable(false))
                        .or_else(|| children.last().and_then(|&n| self.type_of(n))),
                    BinaryOp::Additive | BinaryOp::Multiplicative => left,
                    BinaryOp::Range => None,
                };
                // `a to b` is parsed as a comparison with the name in between
                let ty = if children.len() == 3 { None } else { ty };
                self.set_type(node, ty);
            }
            SyntaxKind::Prefix(op) => {
                self.bind_children(node);
                let ty = match op {
                    PrefixOp::Not => Some(self.api.descriptor("kotlin.Boolean")),
                    _ => tree.children(node).first().and_then(|&n| self.type_of(n)),
                };
                self.set_type(node, ty);
            }
            SyntaxKind::Cast { safe } => {
                self.bind_children(node);
                let ty = tree
                    .children(node)
                    .get(1)
                    .map(|&target| self.type_ref(target))
                    .map(|ty| if safe { ty.nullable(true) } else { ty });
                self.set_type(node, ty);
            }
            SyntaxKind::Paren => {
                self.bind_children(node);
                let inner = tree.children(node).first().and_then(|&n| self.type_of(n));
                self.set_type(node, inner);
            }
            SyntaxKind::NotNull => {
                self.bind_children(node);
                let inner = tree
                    .children(node)
                    .first()
                    .and_then(|&n| self.type_of(n))
                    .map(|ty| ty.nullable(false));
                self.set_type(node, inner);
            }
            SyntaxKind::If => {
                self.bind_children(node);
                let children = tree.children(node);
                // `if (c) a else b` agrees on a type only when both branches do
                let ty = match children {
                    [_, then, otherwise] => {
                        let (a, b) = (self.type_of(*then), self.type_of(*otherwise));
                        a.filter(|a| b.as_ref().is_some_and(|b| b.fq_name == a.fq_name))
                    }
                    _ => None,
                };
                self.set_type(node, ty);
            }
            SyntaxKind::Import | SyntaxKind::TypeRef { .. } | SyntaxKind::Error => {}
            SyntaxKind::Parameter { .. }
            | SyntaxKind::Index
            | SyntaxKind::Return
            | SyntaxKind::Throw
            | SyntaxKind::Assignment => self.bind_children(node),
        }
    }

    fn bind_function(&mut self, node: NodeId) {
        let tree = self.tree;
        let local = tree.parent(node).is_some_and(|parent| {
            matches!(
                tree.syntax_kind(parent),
                SyntaxKind::Block | SyntaxKind::Lambda
            )
        });
        if local {
            self.declare_local(node);
        }
        let receiver = tree.slots(node).receiver.map(|ty| self.type_ref(ty));
        let frame = self.frame_with_parameters(node, receiver);
        self.push(frame);
        self.bind_children(node);
        self.pop();

        if !self.model.declared.contains_key(&node) {
            let body = tree.slots(node).value.and_then(|body| self.type_of(body));
            if let Some(ty) = body {
                self.model.declared.insert(node, ty);
            }
        }
    }

    fn bind_lambda(&mut self, node: NodeId) {
        let tree = self.tree;
        let context = self.lambdas.remove(&node).unwrap_or_default();
        let parameters: Vec<NodeId> = tree
            .children(node)
            .iter()
            .copied()
            .filter(|&child| matches!(tree.syntax_kind(child), SyntaxKind::Parameter { .. }))
            .collect();
        if let ([single], Some(ty)) = (parameters.as_slice(), &context.parameter) {
            self.model.declared.entry(*single).or_insert_with(|| ty.clone());
        }

        let mut frame = self.frame_with_parameters(node, context.receiver);
        if parameters.is_empty() {
            frame.implicit_it = true;
            frame.it_type = context.parameter;
        }
        self.push(frame);
        self.bind_children(node);
        self.pop();
        let ty = self.api.descriptor("kotlin.Function");
        self.set_type(node, Some(ty));
    }

    fn bind_selector(&mut self, selector: NodeId, receiver: Option<TypeDescriptor>) {
        match self.tree.syntax_kind(selector) {
            SyntaxKind::NameRef => {
                let resolution = self.resolve_name(selector, &Lookup::Explicit(receiver));
                self.record(selector, resolution);
            }
            SyntaxKind::Call => self.bind_call(selector, Lookup::Explicit(receiver)),
            _ => self.bind(selector),
        }
    }

    fn bind_call(&mut self, node: NodeId, lookup: Lookup) {
        let tree = self.tree;
        let callee = tree.callee(node);
        let lambda = tree.trailing_lambda(node);
        let arguments: Vec<NodeId> = tree
            .children(node)
            .iter()
            .copied()
            .filter(|&child| Some(child) != callee && Some(child) != lambda)
            .collect();
        for &argument in &arguments {
            self.bind(argument);
        }
        let arity = arguments.len() + usize::from(lambda.is_some());

        let resolution = match callee {
            Some(callee) if tree.syntax_kind(callee) == SyntaxKind::NameRef => {
                let first_argument = arguments.first().and_then(|&a| self.type_of(a));
                let resolution =
                    self.resolve_call(node, callee, arity, &lookup, first_argument.as_ref());
                self.model.references.extend(resolution.target.map(|t| (callee, t)));
                if let Some(receiver) = &resolution.receiver {
                    self.model.receivers.insert(callee, receiver.clone());
                }
                if let Some(callable) = &resolution.callable {
                    self.model.callables.insert(callee, callable.clone());
                }
                // the callee names the invocation, so it carries its result
                self.set_type(callee, resolution.ty.clone());
                resolution
            }
            Some(callee) => {
                self.bind(callee);
                Resolution::default()
            }
            None => Resolution::default(),
        };

        // a call shares its callee's receiver but resolves to no declaration
        let Resolution {
            receiver,
            callable,
            ty,
            lambda: context,
            ..
        } = resolution;
        if let Some(lambda) = lambda {
            self.lambdas.insert(lambda, context);
            self.bind(lambda);
        }
        if let Some(receiver) = receiver {
            self.model.receivers.insert(node, receiver);
        }
        if let Some(callable) = callable {
            self.model.callables.insert(node, callable);
        }
        self.set_type(node, ty);
    }

    fn record(&mut self, node: NodeId, resolution: Resolution) {
        trace!(
            node = %node,
            name = self.tree.name(node).unwrap_or_default(),
            target = ?resolution.target,
            "resolved name"
        );
        if let Some(target) = resolution.target {
            self.model.references.insert(node, target);
        }
        if let Some(receiver) = resolution.receiver {
            self.model.receivers.insert(node, receiver);
        }
        if let Some(callable) = resolution.callable {
            self.model.callables.insert(node, callable);
        }
        self.set_type(node, resolution.ty);
    }

    // ---- resolution ---------------------------------------------------

    fn declared(&self, node: NodeId) -> Option<TypeDescriptor> {
        self.model.declared.get(&node).cloned()
    }

    /// A value name: local, member of an implicit receiver, or member of
    /// the explicit receiver after `.`.
    fn resolve_name(&self, node: NodeId, lookup: &Lookup) -> Resolution {
        let Some(name) = self.tree.name(node) else {
            return Resolution::default();
        };
        match lookup {
            Lookup::Explicit(Some(receiver)) => {
                self.member_property(receiver, name).unwrap_or_default()
            }
            Lookup::Explicit(None) => Resolution::default(),
            Lookup::Implicit => {
                if let Some(resolution) = self.resolve_local(name) {
                    return resolution;
                }
                for receiver in self.frames.iter().rev().filter_map(|f| f.receiver.as_ref()) {
                    if let Some(resolution) = self.member_property(receiver, name) {
                        return resolution;
                    }
                }
                match self.by_simple.get(name) {
                    Some(&class) => Resolution {
                        target: Some(class),
                        ..Resolution::default()
                    },
                    None => Resolution::default(),
                }
            }
        }
    }

    /// Locals of every enclosing frame win over implicit receiver members.
    fn resolve_local(&self, name: &str) -> Option<Resolution> {
        for frame in self.frames.iter().rev() {
            if name == "it" && frame.implicit_it {
                return Some(Resolution {
                    ty: frame.it_type.clone(),
                    ..Resolution::default()
                });
            }
            if let Some(&local) = frame.locals.get(name) {
                return Some(Resolution {
                    target: Some(local),
                    ty: self.declared(local),
                    ..Resolution::default()
                });
            }
        }
        None
    }

    fn member_property(&self, receiver: &TypeDescriptor, name: &str) -> Option<Resolution> {
        let tree = self.tree;
        for fq_name in receiver.lineage() {
            let Some(info) = self.by_fq.get(fq_name).and_then(|n| self.classes.get(n)) else {
                continue;
            };
            let member = info.members.get(name).and_then(|members| {
                members.iter().copied().find(|&m| {
                    matches!(
                        tree.syntax_kind(m),
                        SyntaxKind::Property { .. } | SyntaxKind::Parameter { .. }
                    )
                })
            });
            if let Some(member) = member {
                return Some(Resolution {
                    target: Some(member),
                    receiver: Some(receiver.clone()),
                    callable: Some(CallableDescriptor::getter(default_getter(name))),
                    ty: self.declared(member),
                    ..Resolution::default()
                });
            }
        }
        let property = self.api.property(receiver, name)?;
        Some(Resolution {
            receiver: Some(receiver.clone()),
            callable: Some(property.callable()),
            ty: self.model_type(&property.ty, Some(receiver)),
            ..Resolution::default()
        })
    }

    fn resolve_call(
        &self,
        call: NodeId,
        callee: NodeId,
        arity: usize,
        lookup: &Lookup,
        first_argument: Option<&TypeDescriptor>,
    ) -> Resolution {
        let Some(name) = self.tree.name(callee) else {
            return Resolution::default();
        };
        let type_arguments = &self.tree.slots(call).type_arguments;
        match lookup {
            Lookup::Explicit(Some(receiver)) => self
                .member_function(receiver, name, arity, type_arguments)
                .unwrap_or_default(),
            Lookup::Explicit(None) => Resolution::default(),
            Lookup::Implicit => {
                let local = self.frames.iter().rev().find_map(|f| f.locals.get(name));
                if let Some(&local) = local {
                    return self.local_call(local, name, arity);
                }
                for receiver in self.frames.iter().rev().filter_map(|f| f.receiver.as_ref()) {
                    if let Some(resolution) =
                        self.member_function(receiver, name, arity, type_arguments)
                    {
                        return resolution;
                    }
                }
                self.global_call(name, arity, type_arguments, first_argument)
                    .unwrap_or_default()
            }
        }
    }

    /// A local function, or a local value invoked like one.
    fn local_call(&self, local: NodeId, name: &str, arity: usize) -> Resolution {
        let tree = self.tree;
        let parameters = if tree.syntax_kind(local) == SyntaxKind::Function {
            self.parameter_count(local)
        } else {
            arity
        };
        Resolution {
            target: Some(local),
            callable: Some(CallableDescriptor::new(name, parameters, CallableKind::Function)),
            ty: (tree.syntax_kind(local) == SyntaxKind::Function)
                .then(|| self.declared(local))
                .flatten(),
            ..Resolution::default()
        }
    }

    fn parameter_count(&self, function: NodeId) -> usize {
        self.tree
            .children(function)
            .iter()
            .filter(|&&c| matches!(self.tree.syntax_kind(c), SyntaxKind::Parameter { .. }))
            .count()
    }

    fn member_function(
        &self,
        receiver: &TypeDescriptor,
        name: &str,
        arity: usize,
        type_arguments: &[String],
    ) -> Option<Resolution> {
        let tree = self.tree;
        for fq_name in receiver.lineage() {
            let Some(info) = self.by_fq.get(fq_name).and_then(|n| self.classes.get(n)) else {
                continue;
            };
            let Some(members) = info.members.get(name) else {
                continue;
            };
            let functions: Vec<NodeId> = members
                .iter()
                .copied()
                .filter(|&m| tree.syntax_kind(m) == SyntaxKind::Function)
                .collect();
            let chosen = functions
                .iter()
                .copied()
                .find(|&f| self.parameter_count(f) == arity)
                .or_else(|| functions.first().copied());
            if let Some(function) = chosen {
                return Some(Resolution {
                    target: Some(function),
                    receiver: Some(receiver.clone()),
                    callable: Some(CallableDescriptor::new(
                        name,
                        self.parameter_count(function),
                        CallableKind::Function,
                    )),
                    ty: self.declared(function),
                    ..Resolution::default()
                });
            }
            // `val action = { ... }` invoked as `action()`
            if let Some(&property) = members
                .iter()
                .find(|&&m| matches!(tree.syntax_kind(m), SyntaxKind::Property { .. }))
            {
                return Some(Resolution {
                    target: Some(property),
                    receiver: Some(receiver.clone()),
                    callable: Some(CallableDescriptor::new(name, arity, CallableKind::Function)),
                    ..Resolution::default()
                });
            }
            // nested class constructor
            if let Some(&class) = members
                .iter()
                .find(|&&m| tree.syntax_kind(m) == SyntaxKind::Class)
            {
                return Some(self.class_constructor(class, name));
            }
        }

        if let Some(function) = self.api.function(receiver, name, arity) {
            return Some(Resolution {
                receiver: Some(receiver.clone()),
                callable: Some(function.callable()),
                ty: function
                    .returns
                    .as_deref()
                    .and_then(|ty| self.model_type(ty, Some(receiver))),
                lambda: self.lambda_context(function, Some(receiver), type_arguments),
                ..Resolution::default()
            });
        }
        // `getProject()` reads the `project` property
        let property = self.api.property_by_getter(receiver, name)?;
        Some(Resolution {
            receiver: Some(receiver.clone()),
            callable: Some(property.callable()),
            ty: self.model_type(&property.ty, Some(receiver)),
            ..Resolution::default()
        })
    }

    fn global_call(
        &self,
        name: &str,
        arity: usize,
        type_arguments: &[String],
        first_argument: Option<&TypeDescriptor>,
    ) -> Option<Resolution> {
        if let Some(&class) = self.by_simple.get(name) {
            return Some(self.class_constructor(class, name));
        }
        if let Some(constructor) = self.api.constructor(name) {
            return Some(Resolution {
                callable: Some(constructor.callable()),
                ty: Some(self.descriptor(&constructor.ty, false)),
                ..Resolution::default()
            });
        }
        let function = self.api.top_level_function(name, arity)?;
        Some(Resolution {
            callable: Some(function.callable()),
            ty: function
                .returns
                .as_deref()
                .and_then(|ty| self.model_type(ty, first_argument)),
            lambda: self.lambda_context(function, first_argument, type_arguments),
            ..Resolution::default()
        })
    }

    fn class_constructor(&self, class: NodeId, name: &str) -> Resolution {
        Resolution {
            target: Some(class),
            callable: Some(CallableDescriptor::new(
                name,
                self.parameter_count(class),
                CallableKind::Constructor,
            )),
            ty: self.declared(class),
            ..Resolution::default()
        }
    }

    fn lambda_context(
        &self,
        function: &FunctionSpec,
        this: Option<&TypeDescriptor>,
        type_arguments: &[String],
    ) -> LambdaContext {
        let from_argument = function
            .lambda_receiver_from_type_argument
            .then(|| type_arguments.first())
            .flatten()
            .map(|name| self.descriptor(name, false));
        let receiver = from_argument.or_else(|| {
            function
                .lambda_receiver
                .as_deref()
                .and_then(|ty| self.model_type(ty, this))
        });
        let parameter = function
            .lambda_parameter
            .as_deref()
            .and_then(|ty| self.model_type(ty, this));
        LambdaContext {
            receiver,
            parameter,
        }
    }
}
