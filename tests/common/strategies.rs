use hunt_core::models::StepDeclaration;
use proptest::prelude::*;

/// Strategy for generating valid step ids
pub fn step_id_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}".prop_filter("reserved root name", |id| id != "initial")
}

/// Strategy for generating acyclic declaration sets.
///
/// Each step may only depend on steps declared before it, which rules out
/// cycles by construction. Step ids are `s0..sN`.
pub fn acyclic_declarations_strategy() -> impl Strategy<Value = Vec<StepDeclaration>> {
    (1usize..12)
        .prop_flat_map(|n| {
            let edges = (0..n)
                .map(|i| prop::collection::vec(any::<bool>(), i))
                .collect::<Vec<_>>();
            (Just(n), edges)
        })
        .prop_map(|(n, edges)| {
            (0..n)
                .map(|i| {
                    let mut decl = StepDeclaration::new(format!("s{i}"), "unit");
                    for (j, &linked) in edges[i].iter().enumerate() {
                        if linked {
                            decl = decl.depends_on(format!("s{j}"));
                        }
                    }
                    decl
                })
                .collect()
        })
}

/// Strategy for generating address strings made of keys and indices
pub fn address_strategy() -> impl Strategy<Value = String> {
    let root = prop_oneof![Just("initial".to_string()), step_id_strategy()];
    let accessor = prop_oneof![
        "[a-z_][a-z0-9_]{0,8}".prop_map(|key| format!(".{key}")),
        (0usize..20).prop_map(|index| format!("[{index}]")),
    ];
    (root, prop::collection::vec(accessor, 0..6))
        .prop_map(|(root, accessors)| format!("{root}{}", accessors.concat()))
}
