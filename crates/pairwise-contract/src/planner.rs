//! Witness-chain planner.
//!
//! Breadth-first search over availability sets. Applying an operation only
//! ever adds its postconditions to the set; nothing is consumed. This is an
//! optimistic over-approximation of what the operations really do, so a
//! returned chain is a witness that the target *may* be reachable, not a
//! proof that executing it will succeed, and it is not necessarily the
//! shortest chain under exact side effects.
//!
//! # Invariants
//!
//! - If the target is already satisfied the plan is empty.
//! - A returned plan never has more than `max_depth` steps.
//! - Every step adds at least one node not already available at that point.
//! - Each availability set is expanded at most once (visited set keyed on the
//!   canonical `BTreeSet` form).

use std::collections::{HashSet, VecDeque};

use crate::{
    error::PlanError,
    graph::ContractGraph,
    node::Availability,
    spec::{OperationSpec, requirements_satisfied},
};

/// Find a chain of operations whose cumulative postconditions satisfy the
/// requirements of `target`, starting from `available`.
///
/// Operations are tried in name order at every level, so the result is
/// deterministic for a given graph and starting set.
pub fn plan_chain_to_enable<'g>(
    target: &OperationSpec,
    graph: &'g ContractGraph,
    available: &Availability,
    max_depth: usize,
) -> Result<Vec<&'g OperationSpec>, PlanError> {
    if requirements_satisfied(target, available) {
        return Ok(Vec::new());
    }

    let mut visited: HashSet<Availability> = HashSet::new();
    visited.insert(available.clone());

    let mut frontier: VecDeque<(Availability, Vec<&'g OperationSpec>)> = VecDeque::new();
    frontier.push_back((available.clone(), Vec::new()));

    while let Some((current, path)) = frontier.pop_front() {
        if path.len() >= max_depth {
            continue;
        }

        for op in graph.operations() {
            if !requirements_satisfied(op, &current) || !op.contributes_to(&current) {
                continue;
            }

            let mut next = current.clone();
            next.extend(op.produces.iter().cloned());
            if visited.contains(&next) {
                continue;
            }

            let mut next_path = path.clone();
            next_path.push(op);

            if requirements_satisfied(target, &next) {
                tracing::debug!(
                    operation = %target.name,
                    steps = next_path.len(),
                    explored = visited.len(),
                    "found witness chain"
                );
                return Ok(next_path);
            }

            visited.insert(next.clone());
            frontier.push_back((next, next_path));
        }
    }

    tracing::debug!(
        operation = %target.name,
        max_depth,
        explored = visited.len(),
        "no chain found"
    );
    Err(PlanError::NotFound { target: target.name.clone(), max_depth })
}

/// [`plan_chain_to_enable`] with the target looked up by name in `graph`.
pub fn plan_chain_to_enable_named<'g>(
    target: &str,
    graph: &'g ContractGraph,
    available: &Availability,
    max_depth: usize,
) -> Result<Vec<&'g OperationSpec>, PlanError> {
    let spec = graph.get(target).ok_or_else(|| PlanError::UnknownOperation(target.to_string()))?;
    plan_chain_to_enable(spec, graph, available, max_depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ResourceStateNode;

    fn node(t: &str, s: &str) -> ResourceStateNode {
        ResourceStateNode::new(t, s)
    }

    fn names<'a>(plan: &[&'a OperationSpec]) -> Vec<&'a str> {
        plan.iter().map(|op| op.name.as_str()).collect()
    }

    /// Connection bring-up: CQ, then QP through RESET → INIT → RTR → RTS.
    fn qp_graph() -> ContractGraph {
        ContractGraph::from_specs([
            OperationSpec::new("create_cq").with_produces(node("CQ", "CREATED")),
            OperationSpec::new("create_qp")
                .with_requires(ResourceStateNode::any("CQ"))
                .with_produces(node("QP", "RESET")),
            OperationSpec::new("modify_qp_init").with_transition("QP", "RESET", "INIT"),
            OperationSpec::new("modify_qp_rtr").with_transition("QP", "INIT", "RTR"),
            OperationSpec::new("modify_qp_rts").with_transition("QP", "RTR", "RTS"),
            OperationSpec::new("post_send").with_requires(node("QP", "RTS")),
        ])
    }

    #[test]
    fn already_satisfied_target_yields_empty_plan() {
        let graph = qp_graph();
        let available: Availability = [node("QP", "RTS")].into_iter().collect();

        let plan = plan_chain_to_enable_named("post_send", &graph, &available, 0).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn finds_full_bring_up_chain() {
        let graph = qp_graph();

        let plan =
            plan_chain_to_enable_named("post_send", &graph, &Availability::new(), 8).unwrap();
        assert_eq!(names(&plan), [
            "create_cq",
            "create_qp",
            "modify_qp_init",
            "modify_qp_rtr",
            "modify_qp_rts"
        ]);
    }

    #[test]
    fn depth_bound_yields_not_found() {
        let graph = qp_graph();

        let result = plan_chain_to_enable_named("post_send", &graph, &Availability::new(), 4);
        assert_eq!(
            result,
            Err(PlanError::NotFound { target: "post_send".to_string(), max_depth: 4 })
        );
    }

    #[test]
    fn unreachable_target_yields_not_found() {
        let graph = qp_graph();
        let target = OperationSpec::new("reg_mr").with_requires(node("PD", "ALLOCATED"));

        let result = plan_chain_to_enable(&target, &graph, &Availability::new(), 16);
        assert!(matches!(result, Err(PlanError::NotFound { .. })));
    }

    #[test]
    fn unknown_target_is_reported() {
        let graph = qp_graph();
        let result = plan_chain_to_enable_named("dealloc_pd", &graph, &Availability::new(), 4);
        assert_eq!(result, Err(PlanError::UnknownOperation("dealloc_pd".to_string())));
    }

    #[test]
    fn states_are_never_consumed() {
        // Needs the QP in RESET and in RTS at once. Only possible because
        // availability is add-only.
        let graph = qp_graph();
        let target = OperationSpec::new("odd")
            .with_requires(node("QP", "RESET"))
            .with_requires(node("QP", "RTS"));

        let plan = plan_chain_to_enable(&target, &graph, &Availability::new(), 8).unwrap();
        assert_eq!(plan.len(), 5);
    }
}
