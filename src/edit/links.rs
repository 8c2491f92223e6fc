//! Connecting and disconnecting `next` / branch pointers.

use super::nodes::pointer;
use super::{DocumentEditor, Edit};
use crate::error::EditError;
use crate::parse::{LinkSlot, START_OPCODE};

impl DocumentEditor {
    /// Point `from`'s `slot` at `to`. Any other pointer into `to` is cleared,
    /// so the link is moved rather than duplicated.
    pub fn connect(
        &self,
        text: &str,
        workflow: &str,
        from: &str,
        slot: &LinkSlot,
        to: &str,
    ) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        let source = wf
            .node(from)
            .ok_or_else(|| EditError::node_not_found(workflow, from))?;
        let target = wf
            .node(to)
            .ok_or_else(|| EditError::node_not_found(workflow, to))?;

        if let LinkSlot::Branch(name) = slot {
            let slots = self.catalog.branch_slots(&source.opcode, &source.branch_names());
            if !slots.iter().any(|s| s == name) {
                return Err(EditError::UnknownBranch {
                    node_id: from.to_string(),
                    branch: name.clone(),
                });
            }
        }
        if target.opcode == START_OPCODE || wf.start_id() == Some(to) {
            return Err(EditError::ProtectedNode(to.to_string()));
        }

        let graph = session.graph(&wf)?;
        if from == to || graph.is_ancestor(to, from) {
            return Err(EditError::WouldCreateCycle {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        for (other, other_slot) in graph.incoming(to) {
            if !(other == from && other_slot == slot) {
                session.set_pointer(workflow, other, other_slot, None)?;
            }
        }
        session.set_pointer(workflow, from, slot, Some(to))?;

        tracing::debug!(workflow, node_id = from, target = to, slot = %slot, "connected");
        session.commit(None)
    }

    pub fn disconnect(&self, text: &str, workflow: &str, from: &str, slot: &LinkSlot) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        if wf.node(from).is_none() {
            return Err(EditError::node_not_found(workflow, from));
        }
        if pointer(&wf, from, slot).is_none() {
            return Err(EditError::LinkNotFound {
                node_id: from.to_string(),
                slot: slot.to_string(),
            });
        }

        session.set_pointer(workflow, from, slot, None)?;

        tracing::debug!(workflow, node_id = from, slot = %slot, "disconnected");
        session.commit(None)
    }
}
