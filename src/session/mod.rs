//! Editing Session Module
//!
//! Holds the mutable side of the engine: the per-surface session store and
//! the notification seam toward the editor host.
//!
//! # Structure
//!
//! - [`store`]: Owned session store (load, insert, remove, reset)
//! - [`host`]: Host request shape and transports

pub mod host;
pub mod store;

pub use host::{
    ChannelTransport, HostRequest, HostTransport, NullTransport, WorkflowSteps,
    IFACE_KIND_WORKFLOW,
};
pub use store::{Snapshot, WorkflowStore};
