//! Draft Workflow Records
//!
//! The persisted form of a workflow as the editor host stores it: a nested
//! step structure over the author's original string ids, plus a payload
//! object keyed by those ids. Group kind is implicit in nesting depth here,
//! exactly as stored; the flattener makes it explicit when it converts a
//! draft into a runtime topology.
//!
//! # Example JSON Format
//!
//! ```json
//! {
//!   "steps": ["qc", ["align", "sort"], "report"],
//!   "stepsData": {
//!     "qc": { "tool": "fastqc" },
//!     "align": { "tool": "bowtie2" },
//!     "sort": { "tool": "samtools" },
//!     "report": { "tool": "multiqc" }
//!   }
//! }
//! ```

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fs;

/// One element of a draft's step structure: an original string id or a
/// nested group.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum DraftNode {
    /// A single step, keyed by its original id.
    Step(String),
    /// A nested group of elements.
    Group(Vec<DraftNode>),
}

/// A persisted workflow record as received from the host.
///
/// Drafts are read-only input: the engine never writes them back, and
/// loading one replaces the whole editing session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DraftWorkflow {
    /// Nested step structure over original string ids.
    #[serde(default)]
    pub steps: Vec<DraftNode>,

    /// Per-step payloads keyed by original id.
    #[serde(rename = "stepsData", default)]
    pub steps_data: HashMap<String, Value>,
}

impl DraftWorkflow {
    /// Creates an empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of steps (leaves) in the draft structure.
    pub fn step_count(&self) -> usize {
        fn count(nodes: &[DraftNode]) -> usize {
            nodes
                .iter()
                .map(|node| match node {
                    DraftNode::Step(_) => 1,
                    DraftNode::Group(children) => count(children),
                })
                .sum()
        }
        count(&self.steps)
    }
}

/// Loads a draft workflow record from a JSON file.
///
/// # Arguments
///
/// * `path` - Path to the draft JSON file
///
/// # Returns
///
/// The parsed draft, or an error naming the file or format problem.
pub fn load_draft(path: &str) -> Result<DraftWorkflow, Box<dyn Error>> {
    info!("Loading draft workflow from: {}", path);

    let content = fs::read_to_string(path).map_err(|e| {
        format!(
            "Failed to read draft file '{}': {}. Check that the file exists and is readable.",
            path, e
        )
    })?;

    debug!("Draft file read successfully ({} bytes)", content.len());

    let draft: DraftWorkflow = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse draft JSON: {}. Check the record format.", e))?;

    info!(
        "Parsed draft: {} steps, {} payload entries",
        draft.step_count(),
        draft.steps_data.len()
    );

    Ok(draft)
}
