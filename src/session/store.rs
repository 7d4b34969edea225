//! Workflow Session Store
//!
//! Owns one live editing session: the current topology, the merged payload
//! map, and the dependency map derived from them. Every operation replaces
//! the whole snapshot rather than patching it in place, recomputes
//! dependencies from scratch (a full pass over the tree, fine at the sizes
//! the editor produces), and then notifies the attached host transport.

use log::{debug, info, warn};
use serde_json::Value;

use crate::topology::{
    flatten_workflow, mutate, parse_dependencies, DependencyMap, DraftWorkflow, GroupKind,
    StepData, StepId, Topology, TopologyError,
};

use super::host::{HostRequest, HostTransport, WorkflowSteps};

/// Distance between consecutively issued runtime ids.
const ID_STRIDE: u64 = 10;

/// An immutable view of the session state after an operation.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Current nested serial/parallel structure.
    pub topology: Topology,

    /// Merged payload map (draft and runtime keys).
    pub steps_data: StepData,

    /// Predecessor map, recomputed after every change.
    pub dependencies: DependencyMap,
}

/// Owned, mutable state for one editing session.
///
/// There is no ambient or global state: embedders hold one store per open
/// editor surface and drop it when the surface closes. All reads go through
/// the current [`Snapshot`]; all writes build a new one.
pub struct WorkflowStore {
    snapshot: Snapshot,
    last_id: u64,
    iface_id: u64,
    transport: Option<Box<dyn HostTransport>>,
}

impl WorkflowStore {
    /// Creates an empty store for the given editor surface.
    pub fn new(iface_id: u64) -> Self {
        Self {
            snapshot: Snapshot::default(),
            last_id: 0,
            iface_id,
            transport: None,
        }
    }

    /// Installs the transport used to notify the host after each change.
    pub fn attach_transport(&mut self, transport: Box<dyn HostTransport>) {
        self.transport = Some(transport);
    }

    /// Replaces the session with a freshly flattened draft.
    ///
    /// Flattens at level 0 and seeds id issuance from the highest assigned
    /// id, so later insertions cannot collide with flattened ids.
    ///
    /// # Errors
    ///
    /// Fails when a draft step has no payload entry; the session keeps its
    /// previous state in that case.
    pub fn load_draft(&mut self, draft: &DraftWorkflow) -> Result<(), TopologyError> {
        let flattened = flatten_workflow(&draft.steps, &draft.steps_data, 0)?;

        if !flattened.topology.is_well_formed() {
            warn!("Loaded draft violates grouping invariants; proceeding as stored");
        }

        self.last_id = flattened
            .topology
            .max_step_id()
            .map(StepId::value)
            .unwrap_or(0);
        self.replace(flattened.topology, flattened.steps_data);

        info!(
            "Loaded draft: {} steps, id issuance starts after {}",
            self.snapshot.topology.step_count(),
            self.last_id
        );
        Ok(())
    }

    /// Inserts a new step and returns its freshly issued id.
    ///
    /// `anchor` is the step the new one is placed next to; `None` means the
    /// outermost position (prepend when `before`, append otherwise), which
    /// needs no nesting decisions. Issued ids grow by a fixed stride per
    /// successful insertion.
    ///
    /// # Errors
    ///
    /// Fails with [`TopologyError::TargetNotFound`] when the anchor is not
    /// in the topology. A failed insertion leaves the store untouched and
    /// does not consume the id.
    pub fn insert_step(
        &mut self,
        payload: Value,
        anchor: Option<StepId>,
        before: bool,
        arrangement: GroupKind,
    ) -> Result<StepId, TopologyError> {
        let id = StepId::new(self.last_id + ID_STRIDE);

        let topology = match anchor {
            Some(target) => {
                mutate::insert_step(&self.snapshot.topology, id, target, before, arrangement)?
            }
            None => {
                let mut topology = self.snapshot.topology.clone();
                if before {
                    topology.prepend_step(id);
                } else {
                    topology.append_step(id);
                }
                topology
            }
        };

        let mut steps_data = self.snapshot.steps_data.clone();
        steps_data.insert(id, payload);

        self.last_id = id.value();
        self.replace(topology, steps_data);

        match anchor {
            Some(target) => info!(
                "Inserted step {} {} step {} ({})",
                id,
                if before { "before" } else { "after" },
                target,
                arrangement
            ),
            None => info!(
                "Inserted step {} at the outermost {}",
                id,
                if before { "start" } else { "end" }
            ),
        }
        Ok(id)
    }

    /// Removes a step and its runtime payload entry.
    ///
    /// Removing an id that is not in the topology is a deliberate no-op;
    /// the session stays as it is and the host is not notified.
    pub fn remove_step(&mut self, id: StepId) {
        if !self.snapshot.topology.contains(id) {
            debug!("Remove of absent step {} ignored", id);
            return;
        }

        let topology = mutate::remove_step(&self.snapshot.topology, id);
        let mut steps_data = self.snapshot.steps_data.clone();
        steps_data.remove(id);
        self.replace(topology, steps_data);

        info!(
            "Removed step {}: {} steps remain",
            id,
            self.snapshot.topology.step_count()
        );
    }

    /// Discards the whole session snapshot and restarts id issuance.
    pub fn reset(&mut self) {
        self.last_id = 0;
        self.replace(Topology::new(), StepData::new());
        info!("Session reset");
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Returns the current topology.
    pub fn topology(&self) -> &Topology {
        &self.snapshot.topology
    }

    /// Returns the current merged payload map.
    pub fn steps_data(&self) -> &StepData {
        &self.snapshot.steps_data
    }

    /// Returns the current dependency map.
    pub fn dependencies(&self) -> &DependencyMap {
        &self.snapshot.dependencies
    }

    /// Returns the predecessors recorded for a step, empty when the step is
    /// unknown.
    pub fn predecessors(&self, id: StepId) -> &[StepId] {
        self.snapshot
            .dependencies
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the payload for a step.
    ///
    /// # Errors
    ///
    /// Fails when the step has no payload entry.
    pub fn payload(&self, id: StepId) -> Result<&Value, TopologyError> {
        self.snapshot.steps_data.payload(id)
    }

    /// Returns the value id issuance last produced.
    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    /// Returns the editor surface id this store notifies.
    pub fn iface_id(&self) -> u64 {
        self.iface_id
    }

    /// Builds the host request describing the current snapshot.
    pub fn host_request(&self) -> HostRequest {
        HostRequest::workflow(
            self.iface_id,
            WorkflowSteps {
                steps: self.snapshot.topology.clone(),
                steps_data: self.snapshot.steps_data.clone(),
            },
        )
    }

    /// Rebuilds the snapshot around the new topology and payload map,
    /// recomputes the dependency map wholesale, and notifies the host.
    fn replace(&mut self, topology: Topology, steps_data: StepData) {
        let dependencies = parse_dependencies(&topology);
        self.snapshot = Snapshot {
            topology,
            steps_data,
            dependencies,
        };
        self.notify_host();
    }

    /// Posts the current snapshot to the host, fire-and-forget.
    fn notify_host(&self) {
        let Some(transport) = &self.transport else {
            return;
        };
        transport.deliver(self.host_request());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::host::{ChannelTransport, IFACE_KIND_WORKFLOW};
    use serde_json::json;
    use std::sync::mpsc::{channel, Receiver};

    fn draft(json: &str) -> DraftWorkflow {
        serde_json::from_str(json).unwrap()
    }

    fn loaded_store() -> WorkflowStore {
        let mut store = WorkflowStore::new(1);
        store
            .load_draft(&draft(
                r#"{
                    "steps": ["a", "b", "c"],
                    "stepsData": { "a": {"n": 1}, "b": {"n": 2}, "c": {"n": 3} }
                }"#,
            ))
            .unwrap();
        store
    }

    fn store_with_channel() -> (WorkflowStore, Receiver<HostRequest>) {
        let (tx, rx) = channel();
        let mut store = WorkflowStore::new(9);
        store.attach_transport(Box::new(ChannelTransport::new(tx)));
        (store, rx)
    }

    #[test]
    fn test_load_draft_assigns_ids_and_dependencies() {
        let store = loaded_store();

        assert_eq!(
            store.topology().step_ids(),
            vec![StepId::new(1), StepId::new(2), StepId::new(3)]
        );
        assert_eq!(store.predecessors(StepId::new(2)), &[StepId::new(1)]);
        assert_eq!(store.last_id(), 3);
    }

    #[test]
    fn test_load_draft_missing_payload_keeps_previous_state() {
        let mut store = loaded_store();

        let result = store.load_draft(&draft(r#"{ "steps": ["ghost"], "stepsData": {} }"#));

        assert!(result.is_err());
        assert_eq!(store.topology().step_count(), 3);
    }

    #[test]
    fn test_insert_ids_grow_by_stride() {
        let mut store = WorkflowStore::new(1);

        let first = store
            .insert_step(json!({}), None, false, GroupKind::Serial)
            .unwrap();
        let second = store
            .insert_step(json!({}), None, false, GroupKind::Serial)
            .unwrap();
        let third = store
            .insert_step(json!({}), None, false, GroupKind::Serial)
            .unwrap();

        assert_eq!(first, StepId::new(10));
        assert_eq!(second, StepId::new(20));
        assert_eq!(third, StepId::new(30));
    }

    #[test]
    fn test_insert_at_outermost_positions() {
        let mut store = WorkflowStore::new(1);

        let end = store
            .insert_step(json!({}), None, false, GroupKind::Serial)
            .unwrap();
        let start = store
            .insert_step(json!({}), None, true, GroupKind::Serial)
            .unwrap();

        assert_eq!(store.topology().step_ids(), vec![start, end]);
        assert_eq!(store.predecessors(end), &[start]);
    }

    #[test]
    fn test_insert_parallel_updates_dependencies() {
        let mut store = loaded_store();

        let new = store
            .insert_step(json!({"n": 4}), Some(StepId::new(2)), false, GroupKind::Parallel)
            .unwrap();

        // b and the new step now share a predecessor, and c waits on both.
        assert_eq!(store.predecessors(new), &[StepId::new(1)]);
        assert_eq!(store.predecessors(StepId::new(2)), &[StepId::new(1)]);
        assert_eq!(
            store.predecessors(StepId::new(3)),
            &[StepId::new(2), new]
        );
        assert_eq!(store.payload(new).unwrap(), &json!({"n": 4}));
    }

    #[test]
    fn test_insert_missing_anchor_leaves_store_untouched() {
        let mut store = loaded_store();
        let before = store.topology().clone();

        let result = store.insert_step(
            json!({}),
            Some(StepId::new(77)),
            false,
            GroupKind::Serial,
        );

        assert_eq!(result, Err(TopologyError::TargetNotFound(StepId::new(77))));
        assert_eq!(store.topology(), &before);
        // The failed attempt did not consume an id.
        let next = store
            .insert_step(json!({}), None, false, GroupKind::Serial)
            .unwrap();
        assert_eq!(next, StepId::new(13));
    }

    #[test]
    fn test_remove_step_updates_snapshot() {
        let mut store = loaded_store();

        store.remove_step(StepId::new(2));

        assert_eq!(
            store.topology().step_ids(),
            vec![StepId::new(1), StepId::new(3)]
        );
        assert_eq!(store.predecessors(StepId::new(3)), &[StepId::new(1)]);
        assert!(store.payload(StepId::new(2)).is_err());
    }

    #[test]
    fn test_remove_absent_step_is_noop() {
        let mut store = loaded_store();
        let before = store.snapshot().topology.clone();

        store.remove_step(StepId::new(77));

        assert_eq!(store.topology(), &before);
    }

    #[test]
    fn test_remove_does_not_reuse_ids() {
        let mut store = loaded_store();

        store.remove_step(StepId::new(3));
        let next = store
            .insert_step(json!({}), None, false, GroupKind::Serial)
            .unwrap();

        assert_eq!(next, StepId::new(13));
    }

    #[test]
    fn test_reset_clears_session() {
        let mut store = loaded_store();

        store.reset();

        assert!(store.topology().is_empty());
        assert!(store.steps_data().is_empty());
        assert!(store.dependencies().is_empty());
        assert_eq!(store.last_id(), 0);
    }

    #[test]
    fn test_every_change_notifies_host() {
        let (mut store, rx) = store_with_channel();

        store
            .load_draft(&draft(r#"{ "steps": ["a"], "stepsData": {"a": {}} }"#))
            .unwrap();
        store
            .insert_step(json!({}), None, false, GroupKind::Serial)
            .unwrap();
        store.remove_step(StepId::new(1));
        store.reset();

        let requests: Vec<HostRequest> = rx.try_iter().collect();
        assert_eq!(requests.len(), 4);
        assert!(requests.iter().all(|r| r.iface_kind == IFACE_KIND_WORKFLOW));
        assert!(requests.iter().all(|r| r.iface_id == 9));
    }

    #[test]
    fn test_host_request_carries_wire_shape() {
        let (mut store, rx) = store_with_channel();

        store
            .load_draft(&draft(
                r#"{ "steps": ["a", ["b", "c"]], "stepsData": {"a": {}, "b": {}, "c": {}} }"#,
            ))
            .unwrap();

        let request = rx.try_recv().unwrap();
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["iface_kind"], json!("workflow"));
        assert_eq!(value["steps"]["steps"], json!([1, [21, 22]]));
        assert!(value["steps"]["stepsData"]["21"].is_object());
    }

    #[test]
    fn test_failed_operations_do_not_notify() {
        let (mut store, rx) = store_with_channel();

        let _ = store.insert_step(
            json!({}),
            Some(StepId::new(5)),
            false,
            GroupKind::Serial,
        );
        store.remove_step(StepId::new(5));

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_payload_missing_after_reset() {
        let mut store = loaded_store();
        store.reset();

        assert_eq!(
            store.payload(StepId::new(1)),
            Err(TopologyError::MissingStepData("1".to_string()))
        );
    }
}
