//! Semantic facts the analyzer asks of its host.
//!
//! Every query may answer `None`. The analyzer treats that as "no verdict"
//! and the rule depending on it simply does not fire.

use crate::syntax::NodeId;
use serde::{Deserialize, Serialize};

/// Static type of an expression: its fully-qualified name, the closure of
/// its supertypes and whether it is nullable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub fq_name: String,
    pub supertypes: Vec<String>,
    pub nullable: bool,
}

impl TypeDescriptor {
    pub fn new(fq_name: impl Into<String>) -> Self {
        Self {
            fq_name: fq_name.into(),
            supertypes: Vec::new(),
            nullable: false,
        }
    }

    pub fn with_supertypes<I, S>(mut self, supertypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supertypes = supertypes.into_iter().map(Into::into).collect();
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn is(&self, fq_name: &str) -> bool {
        self.fq_name == fq_name
    }

    /// True when the type is `fq_name` or has it among its supertypes.
    pub fn is_instance_of(&self, fq_name: &str) -> bool {
        self.is(fq_name) || self.supertypes.iter().any(|s| s == fq_name)
    }

    /// The type itself followed by its supertypes.
    pub fn lineage(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.fq_name.as_str()).chain(self.supertypes.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallableKind {
    Function,
    PropertyGetter,
    Constructor,
}

/// What a reference invokes, as seen from the JVM: `project` on a task is
/// the getter `getProject` with no value parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallableDescriptor {
    pub name: String,
    pub value_parameters: usize,
    pub kind: CallableKind,
}

impl CallableDescriptor {
    pub fn new(name: impl Into<String>, value_parameters: usize, kind: CallableKind) -> Self {
        Self {
            name: name.into(),
            value_parameters,
            kind,
        }
    }

    pub fn getter(name: impl Into<String>) -> Self {
        Self::new(name, 0, CallableKind::PropertyGetter)
    }

    /// Name as a build author writes it: `getTaskDependencies` reads as
    /// `taskDependencies`.
    pub fn display_name(&self) -> String {
        normalize_accessor(&self.name)
    }
}

pub fn normalize_accessor(name: &str) -> String {
    let stripped = match name.strip_prefix("get") {
        Some(rest) if rest.chars().next().is_some_and(char::is_uppercase) => rest,
        _ => name,
    };
    let mut chars = stripped.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub trait SemanticOracle {
    /// The in-file declaration a reference names.
    fn resolve_reference(&self, node: NodeId) -> Option<NodeId>;

    fn resolve_type(&self, node: NodeId) -> Option<TypeDescriptor>;

    /// Type of the explicit or implicit receiver a member reference is
    /// dispatched on.
    fn resolve_receiver_type(&self, node: NodeId) -> Option<TypeDescriptor>;

    fn resolve_callable(&self, node: NodeId) -> Option<CallableDescriptor>;

    /// Declared (or inferred) type of a declaration node.
    fn declared_type(&self, declaration: NodeId) -> Option<TypeDescriptor>;
}
