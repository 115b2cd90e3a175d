use crate::syntax::NodeId;
use serde::{Deserialize, Serialize};

pub const SCRIPT_OBJECT_REFERENCE: &str = "Cannot serialize Gradle script object references as these are not supported with the configuration cache.";

pub const POTENTIAL_FOOTER: &str = "This is just potentially a configuration cache error.\n\nWhy is it just potentially a problem? Because it might be triggered only when some code path is executed, but with code analysis we are not sure if it will. It's still better to fix the issue.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProblemKind {
    ScriptObjectReference,
    UnsupportedTaskAccessor,
    UnserializableLocal,
    NonSerializableType,
}

impl ProblemKind {
    pub fn code(self) -> &'static str {
        match self {
            ProblemKind::ScriptObjectReference => "script-object-reference",
            ProblemKind::UnsupportedTaskAccessor => "unsupported-task-accessor",
            ProblemKind::UnserializableLocal => "unserializable-local",
            ProblemKind::NonSerializableType => "non-serializable-type",
        }
    }
}

/// One configuration-cache incompatibility found at `origin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Problem {
    pub origin: NodeId,
    pub kind: ProblemKind,
    pub message: String,
    pub suggestion: Option<String>,
    /// The triggering code is certain but its execution is not proven.
    pub is_potential: bool,
}

impl Problem {
    pub fn new(origin: NodeId, kind: ProblemKind, message: impl Into<String>) -> Self {
        Self {
            origin,
            kind,
            message: message.into(),
            suggestion: None,
            is_potential: false,
        }
    }

    pub fn script_object_reference(origin: NodeId) -> Self {
        Self::new(origin, ProblemKind::ScriptObjectReference, SCRIPT_OBJECT_REFERENCE)
            .with_suggestion("copy the value into a local variable declared outside the execution block")
    }

    pub fn unsupported_task_accessor(origin: NodeId, accessor: &str) -> Self {
        Self::new(
            origin,
            ProblemKind::UnsupportedTaskAccessor,
            format!(
                "Invocation of 'Task.{}' by task at execution time is unsupported.",
                accessor
            ),
        )
        .potential(true)
    }

    pub fn unserializable_local(origin: NodeId, fq_name: &str) -> Self {
        Self::new(
            origin,
            ProblemKind::UnserializableLocal,
            format!(
                "Cannot serialize object of type '{}', as these are not supported with the configuration cache.",
                fq_name
            ),
        )
    }

    pub fn non_serializable_type(origin: NodeId, fq_name: &str, nullable: bool) -> Self {
        Self::new(
            origin,
            ProblemKind::NonSerializableType,
            format!(
                "Accessing non-serializable type '{}' caused by invocation. These are not supported with the configuration cache.",
                fq_name
            ),
        )
        .potential(nullable)
    }

    pub fn potential(mut self, is_potential: bool) -> Self {
        self.is_potential = is_potential;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// User-facing text. `line_reference` is set when the problem is shown
    /// somewhere other than where it was found.
    pub fn render(&self, line_reference: Option<usize>) -> String {
        let mut message = self.message.clone();
        if let Some(line) = line_reference {
            message.push_str(&format!(" At line: {}", line));
        }
        if self.is_potential {
            message.push_str("\n\n");
            message.push_str(POTENTIAL_FOOTER);
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn definite_problem_renders_message_only() {
        let problem = Problem::unserializable_local(NodeId(3), "java.lang.Thread");
        assert_eq!(
            problem.render(None),
            "Cannot serialize object of type 'java.lang.Thread', as these are not supported with the configuration cache."
        );
    }

    #[test]
    fn line_reference_precedes_footer() {
        let problem = Problem::unsupported_task_accessor(NodeId(1), "project");
        let text = problem.render(Some(12));
        assert!(text.starts_with(
            "Invocation of 'Task.project' by task at execution time is unsupported. At line: 12\n\n"
        ));
        assert!(text.ends_with(POTENTIAL_FOOTER));
    }

    #[test]
    fn nullable_forbidden_type_is_potential() {
        assert!(Problem::non_serializable_type(NodeId(0), "org.gradle.api.Project", true).is_potential);
        assert!(!Problem::non_serializable_type(NodeId(0), "org.gradle.api.Project", false).is_potential);
    }
}
