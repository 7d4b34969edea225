//! Topology Mutations
//!
//! Pure tree transforms: inserting a step next to a target, removing a
//! step, and the collapsing pass that restores the structural invariants
//! (no empty groups, no singleton groups) after a removal.
//!
//! Every function builds and returns a new topology; the session store
//! replaces its snapshot wholesale with the result.

use log::debug;

use super::error::TopologyError;
use super::model::{GroupKind, StepId, StepNode, Topology};

/// Inserts `new` adjacent to `target`.
///
/// When the requested arrangement matches the kind of the sequence holding
/// the target, the new leaf is spliced in directly next to it. Otherwise
/// the target is replaced by a fresh two-element group of the requested
/// kind holding the pair, ordered per `before`. Arrangements differ exactly
/// when a group one level deeper is needed, so the wrap never breaks the
/// alternation invariant.
///
/// Outermost insertion (no target) is the caller's job via
/// [`Topology::prepend_step`] and [`Topology::append_step`].
///
/// # Errors
///
/// Returns [`TopologyError::TargetNotFound`] when the target occurs nowhere
/// in the topology. A vanished target means the caller's view is stale, and
/// that surfaces as an error rather than an unchanged rebuild.
pub fn insert_step(
    topology: &Topology,
    new: StepId,
    target: StepId,
    before: bool,
    arrangement: GroupKind,
) -> Result<Topology, TopologyError> {
    let (nodes, found) = insert_into(
        &topology.nodes,
        GroupKind::Serial,
        new,
        target,
        before,
        arrangement,
    );

    if !found {
        return Err(TopologyError::TargetNotFound(target));
    }

    debug!(
        "Inserted step {} {} step {} ({})",
        new,
        if before { "before" } else { "after" },
        target,
        arrangement
    );
    Ok(Topology::from_nodes(nodes))
}

/// Rebuilds one level, splicing or wrapping at the target leaf. `kind` is
/// the arrangement of the sequence being rebuilt.
fn insert_into(
    nodes: &[StepNode],
    kind: GroupKind,
    new: StepId,
    target: StepId,
    before: bool,
    arrangement: GroupKind,
) -> (Vec<StepNode>, bool) {
    let mut out = Vec::with_capacity(nodes.len() + 1);
    let mut found = false;

    for node in nodes {
        match node {
            StepNode::Leaf(id) if *id == target => {
                found = true;
                let pair = if before { [new, target] } else { [target, new] };

                if arrangement == kind {
                    // Same arrangement as this level: splice, no new nesting.
                    out.extend(pair.iter().map(|id| StepNode::Leaf(*id)));
                } else {
                    // Different arrangement: wrap the pair one level deeper.
                    out.push(StepNode::Group(
                        arrangement,
                        pair.iter().map(|id| StepNode::Leaf(*id)).collect(),
                    ));
                }
            }
            StepNode::Leaf(id) => out.push(StepNode::Leaf(*id)),
            StepNode::Group(inner_kind, children) => {
                let (rebuilt, hit) =
                    insert_into(children, *inner_kind, new, target, before, arrangement);
                found = found || hit;
                out.push(StepNode::Group(*inner_kind, rebuilt));
            }
        }
    }

    (out, found)
}

/// Removes every occurrence of `target` and collapses the result.
///
/// Removing an id that occurs nowhere returns an equal topology; removal is
/// a deliberate no-op in that case, so callers can issue deletes without
/// checking first.
pub fn remove_step(topology: &Topology, target: StepId) -> Topology {
    let pruned = prune(&topology.nodes, target);
    let topology = Topology::from_nodes(collapse_nodes(pruned, GroupKind::Serial));

    debug!(
        "Removed step {}: {} steps remain",
        target,
        topology.step_count()
    );
    topology
}

/// Drops every leaf equal to `target`, leaving group structure untouched.
fn prune(nodes: &[StepNode], target: StepId) -> Vec<StepNode> {
    nodes
        .iter()
        .filter_map(|node| match node {
            StepNode::Leaf(id) if *id == target => None,
            StepNode::Leaf(id) => Some(StepNode::Leaf(*id)),
            StepNode::Group(kind, children) => {
                Some(StepNode::Group(*kind, prune(children, target)))
            }
        })
        .collect()
}

/// Runs the collapsing pass over a whole topology.
///
/// The pass is depth-first, so nested collapses cascade upward in a single
/// sweep: empty groups disappear, and a singleton group is replaced by its
/// sole element. When that sole element is itself a group whose kind
/// matches the surrounding level, its children are spliced in directly,
/// which keeps the level's serial or parallel meaning intact instead of
/// re-tagging the hoisted chain.
///
/// Collapsing an already collapsed topology returns it unchanged.
pub fn collapse_topology(topology: &Topology) -> Topology {
    Topology::from_nodes(collapse_nodes(topology.nodes.clone(), GroupKind::Serial))
}

/// Collapses one level. `level` is the arrangement of the sequence the
/// nodes sit in, which decides whether a hoisted group can be spliced.
fn collapse_nodes(nodes: Vec<StepNode>, level: GroupKind) -> Vec<StepNode> {
    let mut out = Vec::with_capacity(nodes.len());

    for node in nodes {
        match node {
            StepNode::Leaf(id) => out.push(StepNode::Leaf(id)),
            StepNode::Group(kind, children) => {
                let mut children = collapse_nodes(children, kind);
                match children.len() {
                    // Empty group: drop it entirely.
                    0 => {}
                    // Singleton group: hoist the sole element one level up.
                    1 => {
                        if let Some(sole) = children.pop() {
                            match sole {
                                StepNode::Group(inner, grand) if inner == level => {
                                    out.extend(grand)
                                }
                                other => out.push(other),
                            }
                        }
                    }
                    _ => out.push(StepNode::Group(kind, children)),
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Topology {
        Topology::from_nodes(vec![
            StepNode::leaf(1),
            StepNode::leaf(2),
            StepNode::leaf(3),
        ])
    }

    #[test]
    fn test_insert_serial_before_splices() {
        // Serial insert at a serial level: plain splice, no new group.
        let result = insert_step(&abc(), StepId::new(99), StepId::new(2), true, GroupKind::Serial)
            .unwrap();

        assert_eq!(
            result.nodes,
            vec![
                StepNode::leaf(1),
                StepNode::leaf(99),
                StepNode::leaf(2),
                StepNode::leaf(3),
            ]
        );
    }

    #[test]
    fn test_insert_serial_after_splices() {
        let result =
            insert_step(&abc(), StepId::new(99), StepId::new(2), false, GroupKind::Serial)
                .unwrap();

        assert_eq!(
            result.nodes,
            vec![
                StepNode::leaf(1),
                StepNode::leaf(2),
                StepNode::leaf(99),
                StepNode::leaf(3),
            ]
        );
    }

    #[test]
    fn test_insert_parallel_at_serial_level_wraps() {
        // Parallel insert at a serial level: target becomes a pair group.
        let result =
            insert_step(&abc(), StepId::new(99), StepId::new(2), false, GroupKind::Parallel)
                .unwrap();

        assert_eq!(
            result.nodes,
            vec![
                StepNode::leaf(1),
                StepNode::parallel(vec![StepNode::leaf(2), StepNode::leaf(99)]),
                StepNode::leaf(3),
            ]
        );
        assert!(result.is_well_formed());
    }

    #[test]
    fn test_insert_parallel_before_orders_pair() {
        let result =
            insert_step(&abc(), StepId::new(99), StepId::new(2), true, GroupKind::Parallel)
                .unwrap();

        assert_eq!(
            result.nodes[1],
            StepNode::parallel(vec![StepNode::leaf(99), StepNode::leaf(2)])
        );
    }

    #[test]
    fn test_insert_parallel_at_parallel_level_splices() {
        // [1, (2 | 3)]: parallel insert next to 3 extends the group.
        let topology = Topology::from_nodes(vec![
            StepNode::leaf(1),
            StepNode::parallel(vec![StepNode::leaf(2), StepNode::leaf(3)]),
        ]);

        let result =
            insert_step(&topology, StepId::new(99), StepId::new(3), false, GroupKind::Parallel)
                .unwrap();

        assert_eq!(
            result.nodes,
            vec![
                StepNode::leaf(1),
                StepNode::parallel(vec![
                    StepNode::leaf(2),
                    StepNode::leaf(3),
                    StepNode::leaf(99),
                ]),
            ]
        );
    }

    #[test]
    fn test_insert_serial_at_parallel_level_wraps() {
        // [1, (2 | 3)]: serial insert after 2 nests a serial pair in the group.
        let topology = Topology::from_nodes(vec![
            StepNode::leaf(1),
            StepNode::parallel(vec![StepNode::leaf(2), StepNode::leaf(3)]),
        ]);

        let result =
            insert_step(&topology, StepId::new(99), StepId::new(2), false, GroupKind::Serial)
                .unwrap();

        assert_eq!(
            result.nodes,
            vec![
                StepNode::leaf(1),
                StepNode::parallel(vec![
                    StepNode::serial(vec![StepNode::leaf(2), StepNode::leaf(99)]),
                    StepNode::leaf(3),
                ]),
            ]
        );
        assert!(result.is_well_formed());
    }

    #[test]
    fn test_insert_missing_target_fails() {
        let err = insert_step(&abc(), StepId::new(99), StepId::new(7), true, GroupKind::Serial)
            .unwrap_err();
        assert_eq!(err, TopologyError::TargetNotFound(StepId::new(7)));
    }

    #[test]
    fn test_insert_into_empty_topology_fails() {
        let err = insert_step(
            &Topology::new(),
            StepId::new(10),
            StepId::new(1),
            true,
            GroupKind::Serial,
        )
        .unwrap_err();
        assert_eq!(err, TopologyError::TargetNotFound(StepId::new(1)));
    }

    #[test]
    fn test_remove_top_level_step() {
        let result = remove_step(&abc(), StepId::new(2));
        assert_eq!(result.nodes, vec![StepNode::leaf(1), StepNode::leaf(3)]);
    }

    #[test]
    fn test_remove_collapses_singleton_group() {
        // [1, (2 | 3), 4] minus 2: the leftover (3) group dissolves.
        let topology = Topology::from_nodes(vec![
            StepNode::leaf(1),
            StepNode::parallel(vec![StepNode::leaf(2), StepNode::leaf(3)]),
            StepNode::leaf(4),
        ]);

        let result = remove_step(&topology, StepId::new(2));
        assert_eq!(
            result.nodes,
            vec![StepNode::leaf(1), StepNode::leaf(3), StepNode::leaf(4)]
        );
        assert!(result.is_well_formed());
    }

    #[test]
    fn test_remove_splices_hoisted_same_kind_chain() {
        // [1, ([2, 3] | 4)] minus 4: the serial chain [2, 3] is hoisted into
        // the serial top level as two plain elements, keeping them a chain.
        let topology = Topology::from_nodes(vec![
            StepNode::leaf(1),
            StepNode::parallel(vec![
                StepNode::serial(vec![StepNode::leaf(2), StepNode::leaf(3)]),
                StepNode::leaf(4),
            ]),
        ]);

        let result = remove_step(&topology, StepId::new(4));
        assert_eq!(
            result.nodes,
            vec![StepNode::leaf(1), StepNode::leaf(2), StepNode::leaf(3)]
        );
        assert!(result.is_well_formed());
    }

    #[test]
    fn test_remove_cascades_nested_collapse() {
        // [1, ([2] | 3)] minus 2: inner singleton empties, outer group
        // collapses to 3.
        let topology = Topology::from_nodes(vec![
            StepNode::leaf(1),
            StepNode::parallel(vec![
                StepNode::serial(vec![StepNode::leaf(2)]),
                StepNode::leaf(3),
            ]),
        ]);

        let result = remove_step(&topology, StepId::new(2));
        assert_eq!(result.nodes, vec![StepNode::leaf(1), StepNode::leaf(3)]);
    }

    #[test]
    fn test_remove_absent_id_is_noop() {
        let result = remove_step(&abc(), StepId::new(42));
        assert_eq!(result, abc());
    }

    #[test]
    fn test_remove_last_step_leaves_empty_topology() {
        let topology = Topology::from_nodes(vec![StepNode::leaf(1)]);
        let result = remove_step(&topology, StepId::new(1));
        assert!(result.is_empty());
    }

    #[test]
    fn test_collapse_drops_empty_groups() {
        let topology = Topology::from_nodes(vec![
            StepNode::leaf(1),
            StepNode::parallel(vec![]),
            StepNode::leaf(2),
        ]);

        let result = collapse_topology(&topology);
        assert_eq!(result.nodes, vec![StepNode::leaf(1), StepNode::leaf(2)]);
    }

    #[test]
    fn test_collapse_is_idempotent() {
        let topology = Topology::from_nodes(vec![
            StepNode::leaf(1),
            StepNode::parallel(vec![
                StepNode::serial(vec![StepNode::leaf(2), StepNode::leaf(3)]),
            ]),
        ]);

        let once = collapse_topology(&topology);
        let twice = collapse_topology(&once);
        assert_eq!(once, twice);
        // The singleton parallel group around the chain dissolves into the
        // serial top level.
        assert_eq!(
            once.nodes,
            vec![StepNode::leaf(1), StepNode::leaf(2), StepNode::leaf(3)]
        );
    }

    #[test]
    fn test_collapse_preserves_well_formed_topology() {
        let topology = Topology::from_nodes(vec![
            StepNode::leaf(1),
            StepNode::parallel(vec![StepNode::leaf(2), StepNode::leaf(3)]),
        ]);

        assert_eq!(collapse_topology(&topology), topology);
    }

    #[test]
    fn test_insert_then_remove_restores_structure() {
        // Wrapping insert followed by removing the new step undoes the wrap.
        let inserted =
            insert_step(&abc(), StepId::new(99), StepId::new(2), false, GroupKind::Parallel)
                .unwrap();
        let restored = remove_step(&inserted, StepId::new(99));

        assert_eq!(restored, abc());
    }
}
