mod common;

use common::strategies::*;
use hunt_core::graph::{GraphValidationError, RunGraph};
use hunt_core::resolution::ValuePath;
use proptest::prelude::*;
use std::collections::HashMap;

proptest! {
    /// Property: declarations that only depend on earlier steps always validate
    #[test]
    fn acyclic_declarations_validate(declarations in acyclic_declarations_strategy()) {
        let count = declarations.len();
        let graph = RunGraph::build(declarations).unwrap();
        prop_assert_eq!(graph.len(), count);
        prop_assert!(!graph.roots().is_empty());
    }

    /// Property: topological order places every step after all of its dependencies
    #[test]
    fn topological_order_respects_dependencies(declarations in acyclic_declarations_strategy()) {
        let graph = RunGraph::build(declarations).unwrap();
        let position: HashMap<&str, usize> = graph
            .topological_order()
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();

        for node in graph.nodes() {
            for dep in &node.declaration.depends_on {
                prop_assert!(position[dep.as_str()] < position[node.id()]);
            }
        }
    }

    /// Property: adding an edge from the first step back to the last closes a
    /// cycle whenever the last step transitively depends on the first
    #[test]
    fn back_edges_are_rejected(declarations in acyclic_declarations_strategy()) {
        let graph = RunGraph::build(declarations.clone()).unwrap();
        let last = format!("s{}", declarations.len() - 1);

        if graph.ancestors(&last).contains("s0") {
            let mut cyclic = declarations;
            cyclic[0] = cyclic[0].clone().depends_on(last);
            let err = RunGraph::build(cyclic).unwrap_err();
            prop_assert!(matches!(err, GraphValidationError::Cycle { .. }), "got {:?}", err);
        }
    }

    /// Property: a self-dependency is always a cycle
    #[test]
    fn self_dependencies_are_rejected(declarations in acyclic_declarations_strategy(), pick in any::<prop::sample::Index>()) {
        let mut cyclic = declarations;
        let idx = pick.index(cyclic.len());
        let id = cyclic[idx].id.clone();
        cyclic[idx] = cyclic[idx].clone().depends_on(id);
        let is_cycle = matches!(
            RunGraph::build(cyclic).unwrap_err(),
            GraphValidationError::Cycle { .. }
        );
        prop_assert!(is_cycle);
    }

    /// Property: canonical addresses survive parse -> display unchanged
    #[test]
    fn addresses_round_trip_through_display(address in address_strategy()) {
        let path = ValuePath::parse(&address).unwrap();
        prop_assert_eq!(path.to_string(), address);
    }
}
