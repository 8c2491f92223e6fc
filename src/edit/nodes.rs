//! Adding, deleting and duplicating node entries.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::writer::BlockWriter;
use super::{DocumentEditor, Edit, Session, deletion_set, reference_paths};
use crate::catalog::{OpcodeSpec, default_literal};
use crate::error::EditError;
use crate::parse::{InlineReporter, LinkSlot, RawValue, START_OPCODE, Workflow, inputs_to_yaml};

/// Where a new node is linked in: the pointer `slot` of `node_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertPoint {
    pub node_id: String,
    pub slot: LinkSlot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddNode {
    pub workflow: String,
    pub opcode: String,
    /// Defaults to the `next` pointer of the main chain's last node.
    #[serde(default)]
    pub after: Option<InsertPoint>,
    #[serde(default)]
    pub successor: Option<String>,
}

impl AddNode {
    pub fn new(workflow: &str, opcode: &str) -> Self {
        AddNode {
            workflow: workflow.to_string(),
            opcode: opcode.to_string(),
            after: None,
            successor: None,
        }
    }

    pub fn after(mut self, node_id: &str, slot: LinkSlot) -> Self {
        self.after = Some(InsertPoint {
            node_id: node_id.to_string(),
            slot,
        });
        self
    }

    pub fn successor(mut self, node_id: &str) -> Self {
        self.successor = Some(node_id.to_string());
        self
    }
}

impl DocumentEditor {
    pub fn add_node(&self, text: &str, args: &AddNode) -> Result<Edit, EditError> {
        let spec = self
            .catalog
            .get(&args.opcode)
            .cloned()
            .ok_or_else(|| EditError::UnknownOpcode(args.opcode.clone()))?;

        let mut session = self.session(text)?;
        let workflow = session.workflow(&args.workflow)?;

        let point = match &args.after {
            Some(point) => {
                let node = workflow
                    .node(&point.node_id)
                    .ok_or_else(|| EditError::node_not_found(&workflow.name, &point.node_id))?;
                if let LinkSlot::Branch(name) = &point.slot {
                    let slots = self.catalog.branch_slots(&node.opcode, &node.branch_names());
                    if !slots.iter().any(|s| s == name) {
                        return Err(EditError::UnknownBranch {
                            node_id: node.id.clone(),
                            branch: name.clone(),
                        });
                    }
                }
                Some(point.clone())
            }
            None => chain_tail(&workflow).map(|id| InsertPoint {
                node_id: id,
                slot: LinkSlot::Next,
            }),
        };

        if let Some(successor) = &args.successor {
            if workflow.node(successor).is_none() {
                return Err(EditError::node_not_found(&workflow.name, successor));
            }
        }
        let displaced = point
            .as_ref()
            .and_then(|p| pointer(&workflow, &p.node_id, &p.slot));
        let successor = args.successor.clone().or(displaced);

        let id = session.fresh_id(&args.opcode);
        let block = new_node_block(&id, &spec, successor.as_deref());
        session.insert_node_block(&workflow.name, point.as_ref().map(|p| p.node_id.as_str()), block)?;
        if let Some(point) = &point {
            session.set_pointer(&workflow.name, &point.node_id, &point.slot, Some(&id))?;
        }

        tracing::debug!(workflow = %workflow.name, node_id = %id, opcode = %args.opcode, "added node");
        session.commit(Some(id))
    }

    /// Remove a node, skipping its predecessors over to its successor.
    pub fn delete_node(&self, text: &str, workflow: &str, node_id: &str) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        let node = wf
            .node(node_id)
            .ok_or_else(|| EditError::node_not_found(workflow, node_id))?;
        if node.opcode == START_OPCODE || wf.start_id() == Some(node_id) {
            return Err(EditError::ProtectedNode(node_id.to_string()));
        }

        let graph = session.graph(&wf)?;
        let doomed = deletion_set(&wf, &graph, &[node_id.to_string()]);
        let doomed_set: HashSet<&str> = doomed.iter().map(String::as_str).collect();

        for target in &doomed {
            let relink = if target == node_id { node.next.as_deref() } else { None };
            for (source, slot) in graph.incoming(target) {
                if !doomed_set.contains(source) {
                    session.set_pointer(workflow, source, slot, relink)?;
                }
            }
        }

        reset_references(&mut session, &wf, &doomed_set)?;

        for target in &doomed {
            session.remove_node_block(workflow, target)?;
        }

        tracing::debug!(workflow, node_id, removed = doomed.len(), "deleted node");
        session.commit(None)
    }

    /// Copy a node under a fresh id, right after the original. The copy is
    /// unlinked: no `next`, no branches, nothing points at it.
    pub fn duplicate_node(&self, text: &str, workflow: &str, node_id: &str) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        let node = wf
            .node(node_id)
            .cloned()
            .ok_or_else(|| EditError::node_not_found(workflow, node_id))?;
        if node.opcode == START_OPCODE {
            return Err(EditError::ProtectedNode(node_id.to_string()));
        }

        let id = session.fresh_id(&node.opcode);
        let inputs: Vec<(String, RawValue)> = node
            .inputs
            .iter()
            .map(|(key, value)| (key.clone(), rename_inline_ids(value, &mut session)))
            .collect();

        let mut w = BlockWriter::new();
        w.key_open(&id);
        w.field("opcode", &Value::String(node.opcode.clone()));
        if !inputs.is_empty() {
            w.field("inputs", &inputs_to_yaml(&inputs));
        }
        session.insert_node_block(workflow, Some(node_id), w.finish())?;

        tracing::debug!(workflow, node_id = %id, source = node_id, "duplicated node");
        session.commit(Some(id))
    }
}

/// Last node of the main chain, following `next` from the start node.
pub(crate) fn chain_tail(workflow: &Workflow) -> Option<String> {
    let mut current = workflow.start_id()?.to_string();
    let mut seen = HashSet::new();
    seen.insert(current.clone());
    while let Some(next) = workflow.node(&current).and_then(|n| n.next.clone()) {
        if !seen.insert(next.clone()) {
            break;
        }
        current = next;
    }
    Some(current)
}

/// Current target of `slot` on `node_id`.
pub(crate) fn pointer(workflow: &Workflow, node_id: &str, slot: &LinkSlot) -> Option<String> {
    let node = workflow.node(node_id)?;
    match slot {
        LinkSlot::Next => node.next.clone(),
        LinkSlot::Branch(name) => node.branch(name).cloned().flatten(),
    }
}

/// Reset every `{node: id}` held by a surviving node whose target is going away.
pub(crate) fn reset_references(
    session: &mut Session<'_>,
    workflow: &Workflow,
    doomed: &HashSet<&str>,
) -> Result<(), EditError> {
    for node in &workflow.nodes {
        if doomed.contains(node.id.as_str()) {
            continue;
        }
        for (path, target) in reference_paths(workflow, &node.id) {
            if doomed.contains(target.as_str()) {
                session.reset_input(workflow, &node.id, &path)?;
            }
        }
    }
    Ok(())
}

/// Header line plus opcode and declared inputs, relative to column 0.
fn new_node_block(id: &str, spec: &OpcodeSpec, successor: Option<&str>) -> Vec<String> {
    let mut w = BlockWriter::new();
    w.key_open(id);
    w.field("opcode", &Value::String(spec.opcode.clone()));

    let mut inputs: Vec<(String, Value)> = spec
        .params
        .iter()
        .map(|p| (p.name.clone(), default_literal(&p.ty)))
        .collect();
    if let Some(dynamic) = &spec.dynamic_inputs {
        for n in 1..=dynamic.min {
            inputs.push((format!("{}{}", dynamic.prefix, n), default_literal(&dynamic.ty)));
        }
    }
    if !inputs.is_empty() {
        w.key_open("inputs");
        for (name, value) in &inputs {
            w.key_open(name);
            w.field("literal", value);
            w.dedent();
        }
        w.dedent();
    }
    if let Some(next) = successor {
        w.field("next", &Value::String(next.to_string()));
    }
    w.finish()
}

fn rename_inline_ids(value: &RawValue, session: &mut Session<'_>) -> RawValue {
    match value {
        RawValue::Inline(inline) => RawValue::Inline(InlineReporter {
            id: inline.id.as_ref().map(|_| session.fresh_id(&inline.opcode)),
            opcode: inline.opcode.clone(),
            inputs: inline
                .inputs
                .iter()
                .map(|(k, v)| (k.clone(), rename_inline_ids(v, session)))
                .collect(),
        }),
        RawValue::WorkflowCall { name, args } => RawValue::WorkflowCall {
            name: name.clone(),
            args: args
                .iter()
                .map(|(k, v)| (k.clone(), rename_inline_ids(v, session)))
                .collect(),
        },
        other => other.clone(),
    }
}
