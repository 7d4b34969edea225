//! Topology Engine Module
//!
//! The pure core of the editor engine: data structures for nested
//! serial/parallel step topologies and the passes that build and transform
//! them. Nothing here holds session state; every pass takes a topology and
//! returns a new one.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (StepId, StepNode, Topology, StepData)
//! - [`draft`]: Persisted draft records and loading
//! - [`flatten`]: Draft-to-runtime id assignment
//! - [`deps`]: Dependency (predecessor) parsing
//! - [`mutate`]: Insert, remove, and collapse transforms
//! - [`error`]: Engine error type

pub mod deps;
pub mod draft;
pub mod error;
pub mod flatten;
pub mod model;
pub mod mutate;

pub use deps::{parse_dependencies, parse_dependencies_with, DependencyMap};
pub use draft::{load_draft, DraftNode, DraftWorkflow};
pub use error::TopologyError;
pub use flatten::{flatten_workflow, FlattenedWorkflow};
pub use model::{GroupKind, StepData, StepId, StepNode, Topology};
pub use mutate::{collapse_topology, insert_step, remove_step};
