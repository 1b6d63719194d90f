//! # Step Readiness
//!
//! Decides, for a Pending step, whether it can be dispatched now, must keep
//! waiting, or will never run. Pure: it only looks at the graph, the current
//! step statuses and which steps have recorded results.
//!
//! Dependency rules:
//!
//! - A step with any transitive ancestor that ended fatally (`FailedFatal` or
//!   `TimedOut`) is skipped, even when the path to that ancestor passes through
//!   optional steps.
//! - `Succeeded` and `FailedOptional` satisfy a dependency.
//! - A `Cancelled` dependency never satisfies it.
//! - Any other terminal status satisfies it only when the dependency was itself
//!   declared optional; otherwise the dependent is skipped, and the skip carries
//!   on down the graph.
//! - A step whose mapping reads a dependency that produced no result is skipped
//!   rather than dispatched into a guaranteed resolution failure.

use crate::error::{StepError, StepErrorDetail};
use crate::graph::RunGraph;
use crate::state_machine::StepRunStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    /// Some dependency is still in flight
    Waiting,
    Ready,
    /// The step can never run
    Skip(StepErrorDetail),
}

/// Evaluate the step at `index`. `statuses` is indexed like `graph.nodes()`.
pub fn evaluate(
    graph: &RunGraph,
    statuses: &[StepRunStatus],
    index: usize,
    has_result: impl Fn(&str) -> bool,
) -> Readiness {
    let Some(node) = graph.node(index) else {
        return Readiness::Skip(StepErrorDetail::internal(format!(
            "step index {index} is not part of the graph"
        )));
    };

    if let Some(failed) = fatal_ancestor(graph, statuses, index) {
        return Readiness::Skip(StepErrorDetail::upstream(format!(
            "upstream step '{}' ended {}",
            graph.nodes()[failed].id(),
            statuses[failed]
        )));
    }

    let mut waiting = false;
    for &dep in &node.dependencies {
        let dep_node = &graph.nodes()[dep];
        let status = statuses[dep];

        if status.satisfies_dependencies() {
            continue;
        }
        if !status.is_terminal() {
            waiting = true;
            continue;
        }
        if !dep_node.declaration.optional || status == StepRunStatus::Cancelled {
            return Readiness::Skip(StepErrorDetail::upstream(format!(
                "dependency '{}' ended {status}",
                dep_node.id()
            )));
        }
    }
    if waiting {
        return Readiness::Waiting;
    }

    // Mapping roots are ancestors, but not necessarily direct dependencies
    for referenced in node.referenced_steps() {
        let Some(ref_index) = graph.index_of(referenced) else {
            continue;
        };
        if !statuses[ref_index].is_terminal() {
            return Readiness::Waiting;
        }
        if !has_result(referenced) {
            let err = StepError::UpstreamUnavailable {
                upstream: referenced.to_string(),
            };
            return Readiness::Skip(err.detail());
        }
    }

    Readiness::Ready
}

/// First ancestor, in topological order, that ended fatally
fn fatal_ancestor(graph: &RunGraph, statuses: &[StepRunStatus], index: usize) -> Option<usize> {
    let ancestors = graph.ancestor_indices(index)?;
    graph
        .topological_indices()
        .iter()
        .copied()
        .find(|idx| ancestors.contains(idx) && statuses[*idx].is_fatal())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepErrorKind;
    use crate::models::StepDeclaration;
    use StepRunStatus::*;

    fn graph() -> RunGraph {
        // a -> b, a -> c(optional), c -> d (reads c), b -> e (reads a only)
        RunGraph::build(vec![
            StepDeclaration::new("a", "unit"),
            StepDeclaration::new("b", "unit").depends_on("a"),
            StepDeclaration::new("c", "unit").depends_on("a").optional(),
            StepDeclaration::new("d", "unit")
                .depends_on("c")
                .map_parameter("input", "c.value"),
            StepDeclaration::new("e", "unit")
                .depends_on("b")
                .map_parameter("input", "a.value"),
        ])
        .unwrap()
    }

    fn idx(graph: &RunGraph, id: &str) -> usize {
        graph.index_of(id).unwrap()
    }

    #[test]
    fn test_roots_are_ready_immediately() {
        let g = graph();
        let statuses = vec![Pending; 5];
        assert_eq!(evaluate(&g, &statuses, idx(&g, "a"), |_| false), Readiness::Ready);
        assert_eq!(evaluate(&g, &statuses, idx(&g, "b"), |_| false), Readiness::Waiting);
    }

    #[test]
    fn test_required_failure_skips_dependents() {
        let g = graph();
        let statuses = vec![FailedFatal, Pending, Pending, Pending, Pending];
        match evaluate(&g, &statuses, idx(&g, "b"), |_| false) {
            Readiness::Skip(detail) => {
                assert_eq!(detail.kind, StepErrorKind::Upstream);
                assert!(detail.message.contains("'a'"));
            }
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn test_optional_failure_unblocks_but_withholds_data() {
        let g = graph();
        let statuses = vec![Succeeded, Pending, FailedOptional, Pending, Pending];
        match evaluate(&g, &statuses, idx(&g, "d"), |id| id == "a") {
            Readiness::Skip(detail) => assert_eq!(detail.kind, StepErrorKind::Upstream),
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn test_skip_propagates_through_optional_dependency() {
        let g = RunGraph::build(vec![
            StepDeclaration::new("a", "unit"),
            StepDeclaration::new("b", "unit").depends_on("a").optional(),
            StepDeclaration::new("c", "unit").depends_on("b"),
        ])
        .unwrap();
        let statuses = vec![FailedFatal, Skipped, Pending];
        match evaluate(&g, &statuses, 2, |_| false) {
            Readiness::Skip(detail) => {
                assert_eq!(detail.kind, StepErrorKind::Upstream);
                assert!(detail.message.contains("'a'"));
            }
            other => panic!("expected skip, got {other:?}"),
        }

        // Same outcome before the optional step itself has been skipped
        let statuses = vec![TimedOut, Pending, Pending];
        assert!(matches!(evaluate(&g, &statuses, 2, |_| false), Readiness::Skip(_)));
    }

    #[test]
    fn test_optional_skip_without_fatal_ancestor_unblocks() {
        // b is skipped because the optional a produced no output, not because
        // anything failed fatally, so c still runs
        let g = RunGraph::build(vec![
            StepDeclaration::new("a", "unit").optional(),
            StepDeclaration::new("b", "unit")
                .depends_on("a")
                .map_parameter("input", "a.value")
                .optional(),
            StepDeclaration::new("c", "unit").depends_on("b"),
        ])
        .unwrap();
        let statuses = vec![FailedOptional, Skipped, Pending];
        assert_eq!(evaluate(&g, &statuses, 2, |_| false), Readiness::Ready);
    }

    #[test]
    fn test_cancelled_optional_dependency_blocks() {
        let g = RunGraph::build(vec![
            StepDeclaration::new("a", "unit").optional(),
            StepDeclaration::new("b", "unit").depends_on("a"),
        ])
        .unwrap();
        let statuses = vec![Cancelled, Pending];
        assert!(matches!(evaluate(&g, &statuses, 1, |_| false), Readiness::Skip(_)));
    }

    #[test]
    fn test_transitive_reference_waits_for_ancestor() {
        let g = graph();
        let statuses = vec![Succeeded, Succeeded, Pending, Pending, Pending];
        assert_eq!(evaluate(&g, &statuses, idx(&g, "e"), |id| id == "a"), Readiness::Ready);

        let statuses = vec![Running, Succeeded, Pending, Pending, Pending];
        assert_eq!(evaluate(&g, &statuses, idx(&g, "e"), |_| false), Readiness::Waiting);
    }
}
