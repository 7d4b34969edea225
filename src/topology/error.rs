//! Topology Error Types
//!
//! Unified error type for topology operations. The engine fails fast on
//! authoring bugs (missing payloads, vanished insertion targets) instead of
//! tolerating them silently; structural oddities in loaded drafts are not
//! errors and are handled by the individual passes.

use thiserror::Error;

use super::model::StepId;

/// Errors produced by topology operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// A step has no entry in the step data map.
    ///
    /// Carries the raw key that was looked up, which may be a draft string
    /// id or a stringified runtime id.
    #[error("no step data entry for step '{0}'")]
    MissingStepData(String),

    /// An insertion target does not occur anywhere in the topology.
    #[error("insertion target step {0} not found in topology")]
    TargetNotFound(StepId),
}
