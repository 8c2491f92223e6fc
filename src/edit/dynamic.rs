//! Growing and shrinking numbered branches (`CATCH1..n`, `CASE1..n`) and
//! numbered inputs (`ITEM1..n`).

use std::collections::HashSet;

use super::nodes::reset_references;
use super::writer::inline_scalar;
use super::{DocumentEditor, Edit, Session, deletion_set};
use crate::catalog::{BranchSlots, branch_slots, default_literal, ordinal_suffix};
use crate::error::EditError;
use crate::parse::{LinkSlot, NodeDefinition, RawValue, Workflow};

impl DocumentEditor {
    /// Append the next numbered branch slot, empty.
    pub fn add_dynamic_branch(&self, text: &str, workflow: &str, node_id: &str) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        let node = wf
            .node(node_id)
            .ok_or_else(|| EditError::node_not_found(workflow, node_id))?;
        let (prefix, _) = self.dynamic_branches(node)?;
        let count = self.branch_count(node)?;
        let name = format!("{}{}", prefix, count + 1);

        let line = session.node_line(workflow, node_id)?;
        let branches = session.buf.ensure_block(line, "branches");
        session.buf.set_scalar(branches, &name, "null");

        tracing::debug!(workflow, node_id, branch = %name, "added branch");
        session.commit(None)
    }

    /// Drop a numbered branch with everything in it; higher-numbered
    /// branches shift down by one.
    pub fn remove_dynamic_branch(
        &self,
        text: &str,
        workflow: &str,
        node_id: &str,
        branch: &str,
    ) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        let node = wf
            .node(node_id)
            .cloned()
            .ok_or_else(|| EditError::node_not_found(workflow, node_id))?;
        let (prefix, min) = self.dynamic_branches(&node)?;
        let count = self.branch_count(&node)?;
        let ordinal = ordinal_suffix(branch, &prefix)
            .filter(|k| *k <= count)
            .ok_or_else(|| EditError::UnknownBranch {
                node_id: node_id.to_string(),
                branch: branch.to_string(),
            })?;
        if count <= min {
            return Err(EditError::MinimumSlots {
                node_id: node_id.to_string(),
                what: "branches".into(),
                min,
            });
        }

        let graph = session.graph(&wf)?;
        let roots: Vec<String> = match node.branch(branch).cloned().flatten() {
            Some(head) => {
                let mut reached: Vec<String> = graph.reachable_from(&head).into_iter().collect();
                reached.sort();
                reached
            }
            None => Vec::new(),
        };
        let doomed = deletion_set(&wf, &graph, &roots);
        let doomed_set: HashSet<&str> = doomed.iter().map(String::as_str).collect();

        for target in &doomed {
            for (source, slot) in graph.incoming(target) {
                let own_slot = source == node_id && *slot == LinkSlot::Branch(branch.to_string());
                if !doomed_set.contains(source) && !own_slot {
                    session.set_pointer(workflow, source, slot, None)?;
                }
            }
        }
        reset_references(&mut session, &wf, &doomed_set)?;

        let line = session.node_line(workflow, node_id)?;
        if let Some(branches) = session.buf.find_entry(line, "branches") {
            session.buf.remove_entry(branches, branch);
        }
        let shifted: Vec<usize> = ordinals(node.branch_names().into_iter(), &prefix, ordinal);
        renumber(&mut session, workflow, node_id, "branches", &prefix, &shifted)?;

        for target in &doomed {
            session.remove_node_block(workflow, target)?;
        }

        tracing::debug!(workflow, node_id, branch, removed = doomed.len(), "removed branch");
        session.commit(None)
    }

    /// Append the next numbered input with its type's default literal.
    pub fn add_dynamic_input(&self, text: &str, workflow: &str, node_id: &str) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        let node = wf
            .node(node_id)
            .ok_or_else(|| EditError::node_not_found(workflow, node_id))?;
        let (prefix, ty, _) = self.dynamic_inputs(node)?;
        let count = input_count(node, &prefix);
        let key = format!("{}{}", prefix, count + 1);
        let literal = inline_scalar(&default_literal(&ty)).unwrap_or_else(|| "null".into());

        let line = session.node_line(workflow, node_id)?;
        let inputs = session.buf.ensure_block(line, "inputs");
        session.buf.set_block(inputs, &key, vec![format!("literal: {}", literal)]);

        tracing::debug!(workflow, node_id, input = %key, "added input");
        session.commit(None)
    }

    /// Drop a numbered input; higher-numbered inputs shift down by one.
    pub fn remove_dynamic_input(
        &self,
        text: &str,
        workflow: &str,
        node_id: &str,
        input: &str,
    ) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        let node = wf
            .node(node_id)
            .cloned()
            .ok_or_else(|| EditError::node_not_found(workflow, node_id))?;
        let (prefix, _, min) = self.dynamic_inputs(&node)?;
        let ordinal = ordinal_suffix(input, &prefix)
            .filter(|_| node.input(input).is_some())
            .ok_or_else(|| EditError::TargetInputNotFound {
                node_id: node_id.to_string(),
                input: input.to_string(),
            })?;
        if input_count(&node, &prefix) <= min {
            return Err(EditError::MinimumSlots {
                node_id: node_id.to_string(),
                what: "inputs".into(),
                min,
            });
        }

        let exclusive = exclusive_reporter(&wf, &node, input);

        let line = session.node_line(workflow, node_id)?;
        if let Some(inputs) = session.buf.find_entry(line, "inputs") {
            session.buf.remove_entry(inputs, input);
        }
        let keys = node.inputs.iter().map(|(k, _)| k.as_str());
        let shifted = ordinals(keys, &prefix, ordinal);
        renumber(&mut session, workflow, node_id, "inputs", &prefix, &shifted)?;

        if let Some(reporter) = exclusive {
            let graph = session.graph(&wf)?;
            for doomed in deletion_set(&wf, &graph, &[reporter]) {
                session.remove_node_block(workflow, &doomed)?;
            }
        }

        tracing::debug!(workflow, node_id, input, "removed input");
        session.commit(None)
    }

    fn dynamic_branches(&self, node: &NodeDefinition) -> Result<(String, usize), EditError> {
        match self.catalog.get(&node.opcode).and_then(|s| s.branches.as_ref()) {
            Some(BranchSlots::Dynamic { prefix, min, .. }) => Ok((prefix.clone(), *min)),
            _ => Err(EditError::NotDynamic {
                node_id: node.id.clone(),
                what: "branches".into(),
            }),
        }
    }

    /// Number of numbered branch slots the node currently offers.
    fn branch_count(&self, node: &NodeDefinition) -> Result<usize, EditError> {
        let (prefix, _) = self.dynamic_branches(node)?;
        let slots = match self.catalog.get(&node.opcode).and_then(|s| s.branches.as_ref()) {
            Some(slots) => branch_slots(slots, &node.branch_names()),
            None => Vec::new(),
        };
        Ok(slots
            .iter()
            .filter(|s| ordinal_suffix(s, &prefix).is_some())
            .count())
    }

    fn dynamic_inputs(&self, node: &NodeDefinition) -> Result<(String, String, usize), EditError> {
        match self.catalog.get(&node.opcode).and_then(|s| s.dynamic_inputs.as_ref()) {
            Some(d) => Ok((d.prefix.clone(), d.ty.clone(), d.min)),
            None => Err(EditError::NotDynamic {
                node_id: node.id.clone(),
                what: "inputs".into(),
            }),
        }
    }
}

fn input_count(node: &NodeDefinition, prefix: &str) -> usize {
    node.inputs
        .iter()
        .filter_map(|(k, _)| ordinal_suffix(k, prefix))
        .max()
        .unwrap_or(0)
}

/// Ordinals above `removed` among `names`, ascending.
fn ordinals<'a>(names: impl Iterator<Item = &'a str>, prefix: &str, removed: usize) -> Vec<usize> {
    let mut out: Vec<usize> = names
        .filter_map(|n| ordinal_suffix(n, prefix))
        .filter(|k| *k > removed)
        .collect();
    out.sort_unstable();
    out
}

/// Rename `prefix{k}` to `prefix{k-1}` for each ordinal in `shifted`
/// (ascending) under the node's `section` block.
fn renumber(
    session: &mut Session<'_>,
    workflow: &str,
    node_id: &str,
    section: &str,
    prefix: &str,
    shifted: &[usize],
) -> Result<(), EditError> {
    for k in shifted {
        let line = session.node_line(workflow, node_id)?;
        let Some(block) = session.buf.find_entry(line, section) else {
            break;
        };
        if let Some(entry) = session.buf.find_entry(block, &format!("{}{}", prefix, k)) {
            session.buf.rename_key(entry, &format!("{}{}", prefix, k - 1));
        }
    }
    Ok(())
}

/// Id of the by-reference reporter held by `input`, when nothing else uses it.
fn exclusive_reporter(workflow: &Workflow, node: &NodeDefinition, input: &str) -> Option<String> {
    let RawValue::NodeRef { id } = node.input(input)? else {
        return None;
    };
    let uses: usize = workflow
        .nodes
        .iter()
        .map(|n| workflow.reporter_refs(&n.id).iter().filter(|r| **r == *id).count())
        .sum();
    (uses == 1).then(|| id.clone())
}
