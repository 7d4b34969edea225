//! Dependency Parser
//!
//! Derives the predecessor map from a topology: for every step, the ordered
//! list of step ids that must complete immediately before it can start.
//!
//! The walk carries a "current predecessor set" along each serial sequence.
//! A leaf records the set and becomes the sole predecessor of whatever
//! follows it. A parallel group hands the same set to every branch, and the
//! union of the branches' terminal leaves, in branch-encounter order,
//! becomes the set for the element after the group. A serial chain nested
//! inside a parallel group therefore contributes only its last step.

use log::debug;
use std::collections::HashMap;

use super::model::{GroupKind, StepId, StepNode, Topology};

/// Map from each step id to its immediate predecessors, possibly empty.
pub type DependencyMap = HashMap<StepId, Vec<StepId>>;

/// Parses a topology into its dependency map.
///
/// The map covers every id reachable in the topology; an empty topology
/// yields an empty map. Parsing never fails: trees that violate the
/// grouping invariants are threaded by each group's own kind tag.
pub fn parse_dependencies(topology: &Topology) -> DependencyMap {
    parse_dependencies_with(topology, &[])
}

/// Parses a topology whose first element should see the given initial
/// predecessor list instead of an empty one.
pub fn parse_dependencies_with(topology: &Topology, initial: &[StepId]) -> DependencyMap {
    let mut map = DependencyMap::new();
    let mut current = initial.to_vec();

    for node in &topology.nodes {
        current = visit(node, &current, &mut map);
    }

    debug!("Parsed dependencies for {} steps", map.len());
    map
}

/// Walks one node with its incoming predecessor set and returns the node's
/// terminal leaves, the predecessors of whatever comes next.
fn visit(node: &StepNode, incoming: &[StepId], map: &mut DependencyMap) -> Vec<StepId> {
    match node {
        StepNode::Leaf(id) => {
            record(map, *id, incoming);
            vec![*id]
        }
        StepNode::Group(GroupKind::Serial, children) => {
            let mut current = incoming.to_vec();
            for child in children {
                current = visit(child, &current, map);
            }
            current
        }
        StepNode::Group(GroupKind::Parallel, branches) => {
            let mut terminals = Vec::new();
            for branch in branches {
                terminals.extend(visit(branch, incoming, map));
            }
            terminals
        }
    }
}

/// Records predecessors for a step. A first sighting stores the list as
/// given; a revisit appends to it instead of overwriting. Revisits cannot
/// happen in a well-formed tree (ids are unique), so the append behavior is
/// tolerated, not promised.
fn record(map: &mut DependencyMap, id: StepId, predecessors: &[StepId]) {
    map.entry(id).or_default().extend_from_slice(predecessors);
}
