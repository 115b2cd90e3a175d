//! Turns the problems classified for one reference into reports, keeping
//! the one-report-per-node invariant and choosing what to show at the
//! reference itself.

use crate::problem::Problem;
use crate::sink::{ProblemSink, Report};
use crate::syntax::{NodeId, SyntaxTree};

/// Problem to show at `reference`: one found there, else a definite one,
/// else the first.
pub fn primary_problem(reference: NodeId, problems: &[Problem]) -> Option<&Problem> {
    problems
        .iter()
        .find(|p| p.origin == reference)
        .or_else(|| problems.iter().find(|p| !p.is_potential))
        .or_else(|| problems.first())
}

pub fn dispatch<T>(tree: &T, reference: NodeId, problems: &[Problem], sink: &mut dyn ProblemSink)
where
    T: SyntaxTree + ?Sized,
{
    let Some(primary) = primary_problem(reference, problems) else {
        return;
    };
    if sink.is_reported(reference) {
        return;
    }

    let trigger_line = tree.line(reference);
    for bubbled in problems.iter().filter(|p| p.origin != reference) {
        if sink.is_reported(bubbled.origin) {
            continue;
        }
        sink.report(Report {
            at: bubbled.origin,
            span: tree.span(bubbled.origin),
            problem: bubbled,
            line_reference: Some(trigger_line),
        });
    }

    let line_reference = (primary.origin != reference).then(|| tree.line(primary.origin));
    sink.report(Report {
        at: reference,
        span: tree.span(reference),
        problem: primary,
        line_reference,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Problem;

    #[test]
    fn primary_prefers_local_then_definite() {
        let here = NodeId(1);
        let bubbled_potential = Problem::unsupported_task_accessor(NodeId(8), "project");
        let bubbled_definite = Problem::script_object_reference(NodeId(9));
        let local = Problem::unsupported_task_accessor(here, "extensions");

        let problems = vec![bubbled_potential.clone(), bubbled_definite.clone(), local.clone()];
        assert_eq!(primary_problem(here, &problems), Some(&local));

        let problems = vec![bubbled_potential.clone(), bubbled_definite.clone()];
        assert_eq!(primary_problem(here, &problems), Some(&bubbled_definite));

        let problems = vec![bubbled_potential.clone()];
        assert_eq!(primary_problem(here, &problems), Some(&bubbled_potential));

        assert_eq!(primary_problem(here, &[]), None);
    }
}
