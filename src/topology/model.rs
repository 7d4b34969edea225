//! Topology Data Model
//!
//! Core data structures for the nested serial/parallel step topology.
//!
//! A topology is an ordered tree: leaves are step ids and groups carry an
//! explicit serial or parallel kind. The top-level sequence is serial, and
//! kinds alternate level by level, so a well-formed tree never nests a
//! group inside a group of the same kind.
//!
//! # Example JSON Format
//!
//! ```json
//! [11, [12, 13], 14]
//! ```
//!
//! Step 11 runs first, then 12 and 13 together, then 14. On the wire a
//! group's kind stays implicit in its nesting depth; in memory it is part
//! of the node itself.

use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use super::error::TopologyError;

/// Numeric identifier of a step within a runtime topology.
///
/// Runtime ids are assigned by the flattener when a draft is loaded and
/// issued by the session store for later insertions. They only stay unique
/// within one editing session; persisted drafts keep their own string ids.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(u64);

impl StepId {
    /// Creates a step id from its numeric value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value of this id.
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Execution arrangement of the elements at one nesting level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// Elements run one after another; each depends on the previous one.
    Serial,
    /// Elements share the same predecessors and run side by side.
    Parallel,
}

impl GroupKind {
    /// Returns the opposite kind. Nesting alternates kinds level by level.
    pub const fn flipped(self) -> Self {
        match self {
            GroupKind::Serial => GroupKind::Parallel,
            GroupKind::Parallel => GroupKind::Serial,
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKind::Serial => write!(f, "serial"),
            GroupKind::Parallel => write!(f, "parallel"),
        }
    }
}

/// One node of the topology tree: a single step or a nested group.
///
/// The kind is carried by the group node itself, so the meaning of a
/// subtree never depends on counting nesting depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepNode {
    /// A single step.
    Leaf(StepId),
    /// A nested group of the given kind.
    Group(GroupKind, Vec<StepNode>),
}

impl StepNode {
    /// Creates a leaf node from a numeric id.
    pub fn leaf(id: u64) -> Self {
        StepNode::Leaf(StepId::new(id))
    }

    /// Creates a serial group from the given children.
    pub fn serial(children: Vec<StepNode>) -> Self {
        StepNode::Group(GroupKind::Serial, children)
    }

    /// Creates a parallel group from the given children.
    pub fn parallel(children: Vec<StepNode>) -> Self {
        StepNode::Group(GroupKind::Parallel, children)
    }
}

impl fmt::Display for StepNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepNode::Leaf(id) => write!(f, "{}", id),
            StepNode::Group(GroupKind::Serial, children) => {
                write!(f, "[{}]", join_nodes(children, ", "))
            }
            StepNode::Group(GroupKind::Parallel, children) => {
                write!(f, "({})", join_nodes(children, " | "))
            }
        }
    }
}

/// Joins node renderings with the separator of their surrounding level.
fn join_nodes(nodes: &[StepNode], separator: &str) -> String {
    nodes
        .iter()
        .map(|node| node.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

// On the wire a group is a plain nested array; the kind is implicit in
// nesting depth, which is the shape the diagram renderer consumes.
impl Serialize for StepNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            StepNode::Leaf(id) => serializer.serialize_u64(id.value()),
            StepNode::Group(_, children) => {
                let mut seq = serializer.serialize_seq(Some(children.len()))?;
                for child in children {
                    seq.serialize_element(child)?;
                }
                seq.end()
            }
        }
    }
}

/// The nested serial/parallel structure of a workflow.
///
/// The top-level node list is an implicit serial sequence. Snapshots are
/// treated as immutable by the session store: every edit builds a new
/// topology and replaces the old one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Topology {
    /// Top-level elements, executed in sequence.
    pub nodes: Vec<StepNode>,
}

impl Topology {
    /// Creates an empty topology.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Creates a topology from a list of top-level nodes.
    pub fn from_nodes(nodes: Vec<StepNode>) -> Self {
        Self { nodes }
    }

    /// Returns the number of steps (leaves) in the topology.
    pub fn step_count(&self) -> usize {
        fn count(nodes: &[StepNode]) -> usize {
            nodes
                .iter()
                .map(|node| match node {
                    StepNode::Leaf(_) => 1,
                    StepNode::Group(_, children) => count(children),
                })
                .sum()
        }
        count(&self.nodes)
    }

    /// Returns true if the topology has no top-level elements.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns every step id in encounter order (depth-first).
    pub fn step_ids(&self) -> Vec<StepId> {
        fn walk(nodes: &[StepNode], out: &mut Vec<StepId>) {
            for node in nodes {
                match node {
                    StepNode::Leaf(id) => out.push(*id),
                    StepNode::Group(_, children) => walk(children, out),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }

    /// Returns true if the given step occurs anywhere in the topology.
    pub fn contains(&self, id: StepId) -> bool {
        fn find(nodes: &[StepNode], id: StepId) -> bool {
            nodes.iter().any(|node| match node {
                StepNode::Leaf(own) => *own == id,
                StepNode::Group(_, children) => find(children, id),
            })
        }
        find(&self.nodes, id)
    }

    /// Returns the highest step id in the topology, if any.
    pub fn max_step_id(&self) -> Option<StepId> {
        self.step_ids().into_iter().max()
    }

    /// Inserts a step at the outermost start position.
    ///
    /// Outermost insertion needs no nesting decisions, so it lives here
    /// rather than in the mutation pass.
    pub fn prepend_step(&mut self, id: StepId) {
        self.nodes.insert(0, StepNode::Leaf(id));
    }

    /// Inserts a step at the outermost end position.
    pub fn append_step(&mut self, id: StepId) {
        self.nodes.push(StepNode::Leaf(id));
    }

    /// Checks the structural invariants: every group has at least two
    /// elements and group kinds strictly alternate, starting serial at the
    /// top level.
    ///
    /// Loaded drafts may violate these; the engine tolerates such trees but
    /// only guarantees its documented behavior for well-formed ones.
    pub fn is_well_formed(&self) -> bool {
        fn check(nodes: &[StepNode], level: GroupKind) -> bool {
            nodes.iter().all(|node| match node {
                StepNode::Leaf(_) => true,
                StepNode::Group(kind, children) => {
                    *kind == level.flipped() && children.len() >= 2 && check(children, *kind)
                }
            })
        }
        check(&self.nodes, GroupKind::Serial)
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", join_nodes(&self.nodes, ", "))
    }
}

impl Serialize for Topology {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.nodes.len()))?;
        for node in &self.nodes {
            seq.serialize_element(node)?;
        }
        seq.end()
    }
}

/// Per-step payload map shared between draft and runtime keys.
///
/// Draft records key payloads by their original string ids; flattening adds
/// entries under the stringified numeric ids without removing the originals.
/// Runtime lookups go through [`StepData::payload`] and fail fast when an
/// entry is missing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct StepData(HashMap<String, Value>);

impl StepData {
    /// Creates an empty payload map.
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Builds the map from a draft record's string-keyed payload object.
    pub fn from_draft(entries: HashMap<String, Value>) -> Self {
        Self(entries)
    }

    /// Returns the payload for a runtime step id.
    ///
    /// A missing entry is an authoring bug, so it surfaces as an error
    /// instead of an absent value that propagates silently.
    pub fn payload(&self, id: StepId) -> Result<&Value, TopologyError> {
        self.0
            .get(&id.to_string())
            .ok_or_else(|| TopologyError::MissingStepData(id.to_string()))
    }

    /// Returns the payload stored under a raw key (draft or runtime).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Stores a payload under a runtime step id.
    pub fn insert(&mut self, id: StepId, payload: Value) {
        self.0.insert(id.to_string(), payload);
    }

    /// Removes the payload for a runtime step id, returning it if present.
    pub fn remove(&mut self, id: StepId) -> Option<Value> {
        self.0.remove(&id.to_string())
    }

    /// Returns true if a payload exists for the runtime step id.
    pub fn contains(&self, id: StepId) -> bool {
        self.0.contains_key(&id.to_string())
    }

    /// Returns the number of entries, counting draft and runtime keys alike.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over all entries (draft and runtime keys alike).
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}
