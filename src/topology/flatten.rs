//! Step ID Assignment
//!
//! Converts a persisted draft structure over original string ids into a
//! runtime topology of freshly assigned numeric ids, and merges each step's
//! payload into a combined map under its new id.
//!
//! An element's id code combines its nesting level with its position:
//! `level * 10 + k` for the k-th element (1-based, counting steps and
//! groups alike). A group recurses with its own code as the sub-level,
//! which keeps sibling groups' children apart. The scheme is positional and
//! does not guarantee uniqueness for arbitrarily deep or wide trees; at the
//! workflow sizes the editor produces (tens of steps) collisions do not
//! occur in practice.

use log::{debug, info};
use std::collections::HashMap;

use serde_json::Value;

use super::draft::DraftNode;
use super::error::TopologyError;
use super::model::{GroupKind, StepData, StepId, StepNode, Topology};

/// A draft converted to runtime form: the numeric-id topology plus the
/// merged payload map holding both original and runtime keys.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedWorkflow {
    /// Runtime topology with explicit group kinds (top level serial).
    pub topology: Topology,
    /// Payload map containing the draft's original entries and one entry
    /// per assigned runtime id.
    pub steps_data: StepData,
}

/// Flattens a draft step structure into a runtime topology.
///
/// Each leaf's payload is copied into the merged map under its new numeric
/// key; the original string-keyed entries stay alongside, so the result
/// holds both. Group kinds alternate with depth starting serial at `level`.
///
/// # Arguments
///
/// * `steps` - The draft's nested step structure
/// * `draft_data` - Payloads keyed by original string id
/// * `level` - Level seed for id codes (the session store uses 0)
///
/// # Errors
///
/// Returns [`TopologyError::MissingStepData`] when a draft step has no
/// payload entry. A missing entry is an authoring bug and surfaces
/// immediately instead of flowing onward as an absent value.
pub fn flatten_workflow(
    steps: &[DraftNode],
    draft_data: &HashMap<String, Value>,
    level: u64,
) -> Result<FlattenedWorkflow, TopologyError> {
    let mut merged = StepData::from_draft(draft_data.clone());
    let nodes = flatten_nodes(steps, level, GroupKind::Serial, &mut merged)?;

    let topology = Topology::from_nodes(nodes);
    info!(
        "Flattened draft: {} steps, {} merged payload entries",
        topology.step_count(),
        merged.len()
    );

    Ok(FlattenedWorkflow {
        topology,
        steps_data: merged,
    })
}

/// Recursive worker for one nesting level. Returns the node structure;
/// payload copies accumulate in the shared merged map.
fn flatten_nodes(
    steps: &[DraftNode],
    level: u64,
    kind: GroupKind,
    merged: &mut StepData,
) -> Result<Vec<StepNode>, TopologyError> {
    let mut nodes = Vec::with_capacity(steps.len());

    for (index, element) in steps.iter().enumerate() {
        // Saturates instead of overflowing on extreme level seeds; ids stop
        // being unique up there, which the positional scheme never promised.
        let code = level.saturating_mul(10).saturating_add(index as u64 + 1);

        match element {
            DraftNode::Step(original) => {
                let payload = merged
                    .get(original)
                    .cloned()
                    .ok_or_else(|| TopologyError::MissingStepData(original.clone()))?;

                let id = StepId::new(code);
                debug!("Assigned id {} to draft step '{}'", id, original);
                merged.insert(id, payload);
                nodes.push(StepNode::Leaf(id));
            }
            DraftNode::Group(children) => {
                // The group's own code becomes the sub-level; kind flips.
                let inner = flatten_nodes(children, code, kind.flipped(), merged)?;
                nodes.push(StepNode::Group(kind.flipped(), inner));
            }
        }
    }

    Ok(nodes)
}
