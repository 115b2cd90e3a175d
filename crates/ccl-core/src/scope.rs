//! Context model: which kind of code the walker is in, and what has been
//! learned about each declaration so far.

use crate::problem::Problem;
use crate::syntax::{DeclarationKind, NodeId};
use std::collections::{HashMap, HashSet};

/// Names introduced while one execution-like scope is active.
#[derive(Debug, Clone, Default)]
pub struct BlockFrame {
    locals: HashSet<NodeId>,
}

impl BlockFrame {
    pub fn declares(&self, declaration: NodeId) -> bool {
        self.locals.contains(&declaration)
    }
}

#[derive(Debug, Clone)]
pub enum ExecutionScope {
    /// Script evaluation; nothing is classified here.
    Configuration,
    /// Inside a genuine deferred block such as `doLast { }`.
    RealExecution(BlockFrame),
    /// Inside a declaration body analyzed as if it ran at execution time.
    PotentialExecution {
        declaration: NodeId,
        frame: BlockFrame,
    },
}

impl ExecutionScope {
    pub fn real() -> Self {
        ExecutionScope::RealExecution(BlockFrame::default())
    }

    /// The body of `declaration` counts the declaration itself as local.
    pub fn potential(declaration: NodeId) -> Self {
        let mut frame = BlockFrame::default();
        frame.locals.insert(declaration);
        ExecutionScope::PotentialExecution { declaration, frame }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ExecutionScope::Configuration)
    }

    pub fn frame(&self) -> Option<&BlockFrame> {
        match self {
            ExecutionScope::Configuration => None,
            ExecutionScope::RealExecution(frame) => Some(frame),
            ExecutionScope::PotentialExecution { frame, .. } => Some(frame),
        }
    }

    pub fn note_declaration(&mut self, declaration: NodeId) {
        match self {
            ExecutionScope::Configuration => {}
            ExecutionScope::RealExecution(frame)
            | ExecutionScope::PotentialExecution { frame, .. } => {
                frame.locals.insert(declaration);
            }
        }
    }

    pub fn declares(&self, declaration: NodeId) -> bool {
        self.frame().is_some_and(|frame| frame.declares(declaration))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnclosingScope {
    TopLevel,
    Nested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    pub node: NodeId,
    pub kind: DeclarationKind,
    pub scope: EnclosingScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Pending,
    InProgress,
    Analyzed,
}

/// Problems found while speculatively analyzing one declaration's body.
#[derive(Debug, Clone)]
pub struct DeclarationRecord {
    pub state: RecordState,
    problems: Vec<Problem>,
}

impl DeclarationRecord {
    fn new() -> Self {
        Self {
            state: RecordState::Pending,
            problems: Vec::new(),
        }
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Store problems, keeping only the first one per origin.
    pub fn absorb(&mut self, problems: impl IntoIterator<Item = Problem>) {
        for problem in problems {
            if self.problems.iter().all(|p| p.origin != problem.origin) {
                self.problems.push(problem);
            }
        }
    }
}

/// All declarations seen during one file analysis.
#[derive(Debug, Default)]
pub struct DeclarationRegistry {
    records: HashMap<NodeId, DeclarationRecord>,
}

impl DeclarationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, declaration: Declaration) -> &mut DeclarationRecord {
        self.records
            .entry(declaration.node)
            .or_insert_with(DeclarationRecord::new)
    }

    pub fn get(&self, node: NodeId) -> Option<&DeclarationRecord> {
        self.records.get(&node)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut DeclarationRecord> {
        self.records.get_mut(&node)
    }

    pub fn state(&self, node: NodeId) -> RecordState {
        self.records
            .get(&node)
            .map(|record| record.state)
            .unwrap_or(RecordState::Pending)
    }

    /// Problems to bubble for `node`; empty while it is still being analyzed.
    pub fn problems_of(&self, node: NodeId) -> &[Problem] {
        match self.records.get(&node) {
            Some(record) if record.state == RecordState::Analyzed => record.problems(),
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
