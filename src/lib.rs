//! Stepflow - Workflow Step Topology Engine
//!
//! The core engine behind a visual workflow editor: it keeps the nested
//! serial/parallel structure of a workflow's steps, assigns runtime ids
//! when a persisted draft is loaded, derives every step's predecessors from
//! the structure, and applies insert/remove edits while keeping the tree's
//! grouping invariants intact. After each change it posts the fresh
//! snapshot to the hosting editor process.
//!
//! # Architecture
//!
//! The library is organized into two main modules:
//!
//! - [`topology`]: Pure data model and transforms (flattening, dependency
//!   parsing, mutations)
//! - [`session`]: Owned per-surface session store and the host
//!   notification seam
//!
//! # Example
//!
//! ```rust
//! use stepflow::session::WorkflowStore;
//! use stepflow::topology::{DraftWorkflow, GroupKind};
//! use serde_json::json;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load a persisted draft into a fresh session
//!     let draft: DraftWorkflow = serde_json::from_str(
//!         r#"{ "steps": ["qc", "align"], "stepsData": { "qc": {}, "align": {} } }"#,
//!     )?;
//!     let mut store = WorkflowStore::new(1);
//!     store.load_draft(&draft)?;
//!
//!     // Append a new step and inspect what it waits on
//!     let id = store.insert_step(json!({"name": "report"}), None, false, GroupKind::Serial)?;
//!     println!("step {} runs after {:?}", id, store.predecessors(id));
//!     Ok(())
//! }
//! ```

pub mod session;
pub mod topology;

// Re-export commonly used types
pub use session::host::{HostRequest, HostTransport};
pub use session::store::WorkflowStore;
pub use topology::deps::{parse_dependencies, DependencyMap};
pub use topology::draft::{load_draft, DraftWorkflow};
pub use topology::error::TopologyError;
pub use topology::model::{GroupKind, StepData, StepId, StepNode, Topology};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Stepflow";
