//! Host Interface
//!
//! The request the engine posts to the editor host after every state
//! change, and the transport seam it travels through. Delivery is
//! fire-and-forget: the host never acknowledges, and readers recompute
//! from the latest snapshot instead of relying on message ordering.

use std::sync::mpsc::Sender;

use log::{debug, warn};
use serde::Serialize;

use crate::topology::{StepData, Topology};

/// Interface kind tag carried by every workflow request.
pub const IFACE_KIND_WORKFLOW: &str = "workflow";

/// The flattened topology and payload map in the shape the host consumes:
/// nested numeric arrays plus the merged string-keyed payload object.
#[derive(Serialize, Debug, Clone)]
pub struct WorkflowSteps {
    /// Nested numeric-id structure (group kinds implicit in depth).
    pub steps: Topology,

    /// Merged payload map (draft and runtime keys).
    #[serde(rename = "stepsData")]
    pub steps_data: StepData,
}

/// A request posted to the host process.
#[derive(Serialize, Debug, Clone)]
pub struct HostRequest {
    /// Interface kind; always `"workflow"` for this engine.
    pub iface_kind: String,

    /// Identifies the editor surface this snapshot belongs to.
    pub iface_id: u64,

    /// Current flattened topology and payloads.
    pub steps: WorkflowSteps,
}

impl HostRequest {
    /// Builds a workflow-kind request for the given editor surface.
    pub fn workflow(iface_id: u64, steps: WorkflowSteps) -> Self {
        Self {
            iface_kind: IFACE_KIND_WORKFLOW.to_string(),
            iface_id,
            steps,
        }
    }
}

/// Transport seam between the engine and the editor host.
///
/// Implementations must not block the caller and must swallow delivery
/// failures; the store treats every notification as fire-and-forget.
pub trait HostTransport {
    /// Delivers one request to the host.
    fn deliver(&self, request: HostRequest);
}

/// Channel-backed transport. Requests go into an `mpsc` sender whose
/// receiving end the embedder (or a test) drains.
pub struct ChannelTransport {
    sender: Sender<HostRequest>,
}

impl ChannelTransport {
    /// Creates a transport that delivers into the given channel.
    pub fn new(sender: Sender<HostRequest>) -> Self {
        Self { sender }
    }
}

impl HostTransport for ChannelTransport {
    fn deliver(&self, request: HostRequest) {
        if let Err(e) = self.sender.send(request) {
            warn!("Host channel closed, dropping workflow request: {}", e);
        }
    }
}

/// Transport that drops every request, for sessions with no host attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransport;

impl HostTransport for NullTransport {
    fn deliver(&self, request: HostRequest) {
        debug!(
            "No host attached, dropping workflow request for iface {}",
            request.iface_id
        );
    }
}
