use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::capability::is_multi_binding;
use crate::error::{FatalValidation, ValidationError};
use crate::generics::filter_by_specialization;
use crate::registry::ComponentRegistry;

/// Builds and validates the dependency graph over a frozen
/// [`ComponentRegistry`], producing either a construction order (topological
/// sort) or a [`FatalValidation`] accumulating every problem
/// found — never stopping at the first error
pub struct DependencyResolver<'a> {
    registry: &'a ComponentRegistry,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(registry: &'a ComponentRegistry) -> Self {
        Self { registry }
    }

    /// Runs full validation: missing/ambiguous dependency detection plus
    /// cycle detection over the whole graph (not just the first cycle
    /// found — every strongly connected component of size > 1, or a
    /// self-loop, is reported).
    pub fn validate_all(&self) -> Result<Vec<String>, FatalValidation> {
        let mut errors = Vec::new();
        let edges = self.build_edges(&mut errors);

        let sccs = tarjan_scc(&edges);
        for scc in &sccs {
            if scc.len() > 1 || edges.get(&scc[0]).map_or(false, |deps| deps.contains(&scc[0])) {
                errors.push(ValidationError::CircularDependency {
                    cycle: close_cycle(scc),
                });
            }
        }

        let discovered = self.registry.descriptor_names();

        if !errors.is_empty() {
            return Err(FatalValidation::new(errors, discovered));
        }

        Ok(topological_order(&discovered, &edges))
    }

    /// Builds the owner -> dependency-name edge list, pushing a
    /// [`ValidationError`] for every unsatisfiable constructor parameter.
    fn build_edges(&self, errors: &mut Vec<ValidationError>) -> HashMap<String, Vec<String>> {
        let mut edges: HashMap<String, Vec<String>> = HashMap::new();

        for descriptor in self.registry.all_descriptors() {
            let owner = descriptor.qualified_name().to_string();
            let deps = edges.entry(owner.clone()).or_default();

            for param in &descriptor.constructor_params {
                let mut candidates = self.registry.descriptors_for(&param.contract);

                if let Some(wanted) = param.generic_specialization {
                    let borrowed: Vec<&_> = candidates.iter().copied().collect();
                    candidates = filter_by_specialization(&borrowed, &param.contract, wanted)
                        .into_iter()
                        .collect();
                }

                if candidates.is_empty() {
                    if !param.optional && !param.has_default {
                        if param.generic_specialization.is_some() {
                            errors.push(ValidationError::SecondaryBindingMissing {
                                owner: owner.clone(),
                                contract: param.contract.clone(),
                                generic_param: param
                                    .generic_specialization
                                    .map(|h| h.qualified_name.to_string())
                                    .unwrap_or_default(),
                            });
                        } else {
                            errors.push(ValidationError::MissingDependency {
                                owner: owner.clone(),
                                parameter: param.name.clone(),
                                required_contract: param.contract.clone(),
                            });
                        }
                    }
                    continue;
                }

                if is_multi_binding(&param.contract) {
                    for c in candidates {
                        deps.push(c.qualified_name().to_string());
                    }
                } else {
                    // Single-binding contract: the registry already resolved
                    // ambiguity at registration time, so exactly the primary
                    // (or sole) candidate is the edge target.
                    deps.push(candidates[0].qualified_name().to_string());
                }
            }
        }

        edges
    }
}

/// Closes an SCC's node list into a reportable path: `[a, b, c, a]`.
fn close_cycle(scc: &[String]) -> Vec<String> {
    let mut cycle = scc.to_vec();
    if let Some(first) = scc.first() {
        cycle.push(first.clone());
    }
    cycle
}

/// Tarjan's strongly-connected-components algorithm, recursive over the
/// edge graph (one stack frame per node on the current DFS path).
///
/// Chosen over a naive DFS-with-visited-set cycle check because it reports
/// every cycle in the graph in one pass (including cycles sharing nodes),
/// which a single "first cycle found" DFS does not. Component dependency
/// graphs are expected to be shallow (constructor chains a few levels deep),
/// so the recursion depth here tracks the longest dependency chain in the
/// registry, not the component count.
fn tarjan_scc(edges: &HashMap<String, Vec<String>>) -> Vec<Vec<String>> {
    struct State {
        index: HashMap<String, usize>,
        lowlink: HashMap<String, usize>,
        on_stack: HashSet<String>,
        stack: Vec<String>,
        next_index: usize,
        sccs: Vec<Vec<String>>,
    }

    fn strongconnect(node: &str, edges: &HashMap<String, Vec<String>>, state: &mut State) {
        state.index.insert(node.to_string(), state.next_index);
        state.lowlink.insert(node.to_string(), state.next_index);
        state.next_index += 1;
        state.stack.push(node.to_string());
        state.on_stack.insert(node.to_string());

        if let Some(successors) = edges.get(node) {
            for succ in successors {
                if !state.index.contains_key(succ) {
                    strongconnect(succ, edges, state);
                    let succ_low = state.lowlink[succ];
                    let node_low = state.lowlink[node];
                    state.lowlink.insert(node.to_string(), node_low.min(succ_low));
                } else if state.on_stack.contains(succ) {
                    let succ_index = state.index[succ];
                    let node_low = state.lowlink[node];
                    state.lowlink.insert(node.to_string(), node_low.min(succ_index));
                }
            }
        }

        if state.lowlink[node] == state.index[node] {
            let mut component = Vec::new();
            loop {
                let w = state.stack.pop().unwrap();
                state.on_stack.remove(&w);
                let is_root = w == node;
                component.push(w);
                if is_root {
                    break;
                }
            }
            state.sccs.push(component);
        }
    }

    let mut state = State {
        index: HashMap::new(),
        lowlink: HashMap::new(),
        on_stack: HashSet::new(),
        stack: Vec::new(),
        next_index: 0,
        sccs: Vec::new(),
    };

    let mut nodes: Vec<&String> = edges.keys().collect();
    nodes.sort();
    for node in nodes {
        if !state.index.contains_key(node) {
            strongconnect(node, edges, &mut state);
        }
    }

    state.sccs
}

/// Kahn's algorithm over the (now acyclic) dependency graph: dependencies
/// are constructed before their dependents.
fn topological_order(nodes: &[String], edges: &HashMap<String, Vec<String>>) -> Vec<String> {
    let mut in_degree: BTreeMap<String, usize> = nodes.iter().cloned().map(|n| (n, 0)).collect();
    let mut reverse: HashMap<String, Vec<String>> = HashMap::new();

    for (owner, deps) in edges {
        for dep in deps {
            *in_degree.entry(owner.clone()).or_insert(0) += 1;
            reverse.entry(dep.clone()).or_default().push(owner.clone());
        }
    }

    let mut initial: Vec<String> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| name.clone())
        .collect();
    initial.sort();
    let mut queue: VecDeque<String> = initial.into();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(node) = queue.pop_front() {
        order.push(node.clone());
        if let Some(dependents) = reverse.get(&node) {
            let mut freed = Vec::new();
            for dependent in dependents {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        freed.push(dependent.clone());
                    }
                }
            }
            freed.sort();
            for f in freed {
                queue.push_back(f);
            }
        }
    }

    order
}
