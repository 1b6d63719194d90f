//! # Run Graph
//!
//! Validated dependency graph built once per run from its step declarations.
//! After [`RunGraph::build`] succeeds the graph is read-only, so the scheduling
//! loop and in-flight steps can share it without synchronisation.
//!
//! Validation order:
//! 1. the definition is non-empty and every id is well formed and unique
//! 2. every `depends_on` entry names a declared step
//! 3. there are no cycles (depth-first search with visiting/visited marks)
//! 4. every parameter address parses and reads only from `initial` or a
//!    transitive dependency

use super::errors::GraphValidationError;
use crate::models::StepDeclaration;
use crate::resolution::{ValuePath, INITIAL_ROOT};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// A declaration plus everything derived from it during validation
#[derive(Debug, Clone)]
pub struct StepNode {
    pub declaration: StepDeclaration,
    /// Parsed `parameter_mapping`, ordered by parameter name
    pub mapping: Vec<(String, ValuePath)>,
    /// Indices of the steps this one depends on
    pub dependencies: Vec<usize>,
    /// Indices of the steps that depend on this one
    pub dependents: Vec<usize>,
}

impl StepNode {
    pub fn id(&self) -> &str {
        &self.declaration.id
    }

    /// Step ids whose output this step's mapping reads
    pub fn referenced_steps(&self) -> BTreeSet<&str> {
        self.mapping
            .iter()
            .filter_map(|(_, path)| path.root().step_id())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

#[derive(Debug, Clone)]
pub struct RunGraph {
    nodes: Vec<StepNode>,
    index: HashMap<String, usize>,
    topological_order: Vec<usize>,
    ancestors: Vec<HashSet<usize>>,
}

impl RunGraph {
    pub fn build(declarations: Vec<StepDeclaration>) -> Result<Self, GraphValidationError> {
        if declarations.is_empty() {
            return Err(GraphValidationError::EmptyDefinition);
        }

        let index = index_step_ids(&declarations)?;

        let mut dependencies: Vec<Vec<usize>> = Vec::with_capacity(declarations.len());
        for declaration in &declarations {
            let mut deps = Vec::with_capacity(declaration.depends_on.len());
            for dependency in &declaration.depends_on {
                let idx = index.get(dependency).copied().ok_or_else(|| {
                    GraphValidationError::UnknownDependency {
                        step_id: declaration.id.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                deps.push(idx);
            }
            dependencies.push(deps);
        }

        let topological_order = topological_sort(&dependencies).map_err(|cycle| {
            GraphValidationError::Cycle {
                path: cycle
                    .into_iter()
                    .map(|idx| declarations[idx].id.clone())
                    .collect(),
            }
        })?;

        // Dependencies come first in topological order, so their ancestor sets
        // are complete by the time a dependent reads them.
        let mut ancestors: Vec<HashSet<usize>> = vec![HashSet::new(); declarations.len()];
        for &idx in &topological_order {
            let mut set = HashSet::new();
            for &dep in &dependencies[idx] {
                set.insert(dep);
                set.extend(ancestors[dep].iter().copied());
            }
            ancestors[idx] = set;
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); declarations.len()];
        for (idx, deps) in dependencies.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(idx);
            }
        }

        let mut nodes = Vec::with_capacity(declarations.len());
        for (idx, (declaration, (deps, dependents))) in declarations
            .into_iter()
            .zip(dependencies.into_iter().zip(dependents))
            .enumerate()
        {
            let mapping = compile_mapping(&declaration, &index, &ancestors[idx])?;
            nodes.push(StepNode {
                declaration,
                mapping,
                dependencies: deps,
                dependents,
            });
        }

        debug!(
            steps = nodes.len(),
            roots = nodes.iter().filter(|n| n.dependencies.is_empty()).count(),
            "Run graph validated"
        );

        Ok(Self {
            nodes,
            index,
            topological_order,
            ancestors,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in declaration order
    pub fn nodes(&self) -> &[StepNode] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> Option<&StepNode> {
        self.nodes.get(idx)
    }

    pub fn index_of(&self, step_id: &str) -> Option<usize> {
        self.index.get(step_id).copied()
    }

    pub fn get(&self, step_id: &str) -> Option<&StepNode> {
        self.index_of(step_id).and_then(|idx| self.nodes.get(idx))
    }

    pub fn declaration(&self, step_id: &str) -> Option<&StepDeclaration> {
        self.get(step_id).map(|node| &node.declaration)
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(StepNode::id)
    }

    /// Steps with no dependencies, in declaration order
    pub fn roots(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|node| node.dependencies.is_empty())
            .map(StepNode::id)
            .collect()
    }

    /// Number of dependencies a step has to wait for
    pub fn in_degree(&self, step_id: &str) -> Option<usize> {
        self.get(step_id).map(|node| node.dependencies.len())
    }

    pub fn dependencies(&self, step_id: &str) -> Vec<&str> {
        self.neighbours(step_id, |node| &node.dependencies)
    }

    pub fn dependents(&self, step_id: &str) -> Vec<&str> {
        self.neighbours(step_id, |node| &node.dependents)
    }

    /// Every step id reachable by following `depends_on` transitively
    pub fn ancestors(&self, step_id: &str) -> BTreeSet<&str> {
        self.index_of(step_id)
            .map(|idx| {
                self.ancestors[idx]
                    .iter()
                    .map(|&a| self.nodes[a].id())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Transitive dependency indices of the node at `idx`
    pub fn ancestor_indices(&self, idx: usize) -> Option<&HashSet<usize>> {
        self.ancestors.get(idx)
    }

    /// Step ids ordered so that every step follows all of its dependencies
    pub fn topological_order(&self) -> Vec<&str> {
        self.topological_order
            .iter()
            .map(|&idx| self.nodes[idx].id())
            .collect()
    }

    /// Node indices in topological order
    pub fn topological_indices(&self) -> &[usize] {
        &self.topological_order
    }

    fn neighbours<'a>(
        &'a self,
        step_id: &str,
        select: impl Fn(&'a StepNode) -> &'a Vec<usize>,
    ) -> Vec<&'a str> {
        self.get(step_id)
            .map(|node| select(node).iter().map(|&i| self.nodes[i].id()).collect())
            .unwrap_or_default()
    }
}

fn index_step_ids(
    declarations: &[StepDeclaration],
) -> Result<HashMap<String, usize>, GraphValidationError> {
    let mut index = HashMap::with_capacity(declarations.len());

    for (idx, declaration) in declarations.iter().enumerate() {
        let id = &declaration.id;
        if id.is_empty() {
            return Err(GraphValidationError::InvalidStepId {
                step_id: id.clone(),
                reason: "step ids cannot be empty",
            });
        }
        if id.contains(['.', '[', ']']) {
            return Err(GraphValidationError::InvalidStepId {
                step_id: id.clone(),
                reason: "step ids cannot contain '.', '[' or ']'",
            });
        }
        if id == INITIAL_ROOT {
            return Err(GraphValidationError::ReservedStepId {
                step_id: id.clone(),
            });
        }
        if index.insert(id.clone(), idx).is_some() {
            return Err(GraphValidationError::DuplicateStepId {
                step_id: id.clone(),
            });
        }
    }

    Ok(index)
}

/// Depth-first topological sort over dependency edges.
///
/// Returns the post-order (dependencies before dependents) or, on a back-edge to
/// a node still being visited, the cycle as a path that starts and ends on the
/// same node.
fn topological_sort(dependencies: &[Vec<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    fn visit(
        idx: usize,
        dependencies: &[Vec<usize>],
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<(), Vec<usize>> {
        marks[idx] = Mark::Visiting;
        stack.push(idx);

        for &dep in &dependencies[idx] {
            match marks[dep] {
                Mark::Visiting => {
                    let start = stack.iter().position(|&s| s == dep).unwrap_or(0);
                    let mut cycle = stack[start..].to_vec();
                    cycle.push(dep);
                    return Err(cycle);
                }
                Mark::Unvisited => visit(dep, dependencies, marks, stack, order)?,
                Mark::Visited => {}
            }
        }

        stack.pop();
        marks[idx] = Mark::Visited;
        order.push(idx);
        Ok(())
    }

    let mut marks = vec![Mark::Unvisited; dependencies.len()];
    let mut order = Vec::with_capacity(dependencies.len());
    let mut stack = Vec::new();

    for idx in 0..dependencies.len() {
        if marks[idx] == Mark::Unvisited {
            visit(idx, dependencies, &mut marks, &mut stack, &mut order)?;
        }
    }

    Ok(order)
}

fn compile_mapping(
    declaration: &StepDeclaration,
    index: &HashMap<String, usize>,
    ancestors: &HashSet<usize>,
) -> Result<Vec<(String, ValuePath)>, GraphValidationError> {
    let mut mapping = Vec::with_capacity(declaration.parameter_mapping.len());

    for (parameter, address) in &declaration.parameter_mapping {
        let path = ValuePath::parse(address).map_err(|source| {
            GraphValidationError::InvalidParameterPath {
                step_id: declaration.id.clone(),
                parameter: parameter.clone(),
                source,
            }
        })?;

        if let Some(reference) = path.root().step_id() {
            let Some(&ref_idx) = index.get(reference) else {
                return Err(GraphValidationError::UnknownReference {
                    step_id: declaration.id.clone(),
                    parameter: parameter.clone(),
                    reference: reference.to_string(),
                });
            };
            if !ancestors.contains(&ref_idx) {
                return Err(GraphValidationError::UndeclaredDependency {
                    step_id: declaration.id.clone(),
                    parameter: parameter.clone(),
                    reference: reference.to_string(),
                });
            }
        }

        mapping.push((parameter.clone(), path));
    }

    Ok(mapping)
}
