//! Fuzz target for chain planning
//!
//! # Strategy
//!
//! Small random contract graphs over a fixed vocabulary of resource types
//! and states, with a random starting availability and target.
//!
//! # Invariants
//!
//! - NEVER panic
//! - A returned chain is no longer than the depth limit
//! - Replaying the chain from the start, every step's requirements hold and
//!   the target's requirements hold at the end

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pairwise_contract::{
    plan_chain_to_enable, requirements_satisfied, Availability, ContractGraph, OperationSpec,
    ResourceStateNode,
};

const TYPES: [&str; 3] = ["QP", "CQ", "MR"];
const STATES: [&str; 4] = ["RESET", "INIT", "RTR", "RTS"];

#[derive(Debug, Arbitrary)]
struct Node {
    resource_type: u8,
    state: u8,
}

impl Node {
    fn resolve(&self) -> ResourceStateNode {
        ResourceStateNode::new(
            TYPES[self.resource_type as usize % TYPES.len()],
            STATES[self.state as usize % STATES.len()],
        )
    }
}

#[derive(Debug, Arbitrary)]
struct Operation {
    requires: Vec<Node>,
    produces: Vec<Node>,
}

impl Operation {
    fn resolve(&self, name: String) -> OperationSpec {
        let spec = self.requires.iter().fold(OperationSpec::new(name), |spec, node| {
            spec.with_requires(node.resolve())
        });
        self.produces.iter().fold(spec, |spec, node| spec.with_produces(node.resolve()))
    }
}

#[derive(Debug, Arbitrary)]
struct Input {
    operations: Vec<Operation>,
    available: Vec<Node>,
    target: Operation,
    max_depth: u8,
}

fuzz_target!(|input: Input| {
    if input.operations.len() > 12 {
        return;
    }

    let graph = ContractGraph::from_specs(
        input.operations.iter().enumerate().map(|(i, op)| op.resolve(format!("op{i}"))),
    );
    let available: Availability = input.available.iter().map(Node::resolve).collect();
    let target = input.target.resolve("target".to_string());
    let max_depth = usize::from(input.max_depth % 8);

    if let Ok(chain) = plan_chain_to_enable(&target, &graph, &available, max_depth) {
        assert!(chain.len() <= max_depth);

        let mut state = available;
        for step in chain {
            assert!(requirements_satisfied(step, &state), "{} not enabled", step.name);
            state.extend(step.produces.iter().cloned());
        }
        assert!(requirements_satisfied(&target, &state));
    }
});
