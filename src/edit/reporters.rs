//! Moving orphans into input slots and taking reporters back out.

use std::collections::{HashMap, HashSet};

use super::nodes::reset_references;
use super::writer::BlockWriter;
use super::{DocumentEditor, Edit, deletion_set, orphan_ids};
use crate::error::EditError;
use crate::parse::{InlineReporter, RawValue, Workflow};

impl DocumentEditor {
    /// Re-emit orphan `orphan` inline as the value of `target`'s `input`.
    ///
    /// Orphans the moved node references by `{node: id}` are inlined with it
    /// when it is their only user; shared ones stay as references. Other
    /// references to a moved node are reset to a default literal.
    pub fn convert_orphan_to_reporter(
        &self,
        text: &str,
        workflow: &str,
        orphan: &str,
        target: &str,
        input: &str,
    ) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        let graph = session.graph(&wf)?;

        let orphan_node = wf
            .node(orphan)
            .ok_or_else(|| EditError::node_not_found(workflow, orphan))?;
        let orphans = orphan_ids(&wf, &graph);
        if !orphans.contains(orphan) {
            return Err(EditError::NotAnOrphan(orphan.to_string()));
        }
        let target_node = wf
            .node(target)
            .ok_or_else(|| EditError::node_not_found(workflow, target))?;

        let accepted = self
            .catalog
            .get(&target_node.opcode)
            .is_some_and(|spec| spec.accepts_input(input));
        if !accepted && target_node.input(input).is_none() {
            return Err(EditError::TargetInputNotFound {
                node_id: target.to_string(),
                input: input.to_string(),
            });
        }

        let uses = reference_counts(&wf);
        let mut moved = Vec::new();
        let inline = inline_orphan(&wf, &orphans, &uses, &orphan_node.id, &mut moved);
        if moved.iter().any(|m| m == target) {
            return Err(EditError::WouldCreateCycle {
                from: orphan.to_string(),
                to: target.to_string(),
            });
        }

        let moved_set: HashSet<&str> = moved.iter().map(String::as_str).collect();
        reset_references(&mut session, &wf, &moved_set)?;

        let mut body = BlockWriter::new();
        body.value(&inline.to_yaml());
        let node_line = session.node_line(workflow, target)?;
        let inputs = session.buf.ensure_block(node_line, "inputs");
        session.buf.set_block(inputs, input, body.finish());

        for id in &moved {
            for (source, slot) in graph.incoming(id) {
                if !moved_set.contains(source) {
                    session.set_pointer(workflow, source, slot, None)?;
                }
            }
        }
        for id in &moved {
            session.remove_node_block(workflow, id)?;
        }

        tracing::debug!(workflow, node_id = orphan, target, input, "converted orphan to reporter");
        session.commit(None)
    }

    /// Clear the reporter at `path` under `parent`, back to a default literal.
    ///
    /// `path` lists input keys from the parent down to the slot. A reporter
    /// kept as its own node entry is deleted once nothing else references it.
    pub fn delete_reporter(
        &self,
        text: &str,
        workflow: &str,
        parent: &str,
        path: &[String],
    ) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        if wf.node(parent).is_none() {
            return Err(EditError::node_not_found(workflow, parent));
        }
        let referenced = value_at(&wf, parent, path).and_then(|value| match value {
            RawValue::NodeRef { id } => Some(id.clone()),
            _ => None,
        });

        session.reset_input(&wf, parent, path)?;

        if let Some(id) = referenced {
            let graph = session.graph(&wf)?;
            let uses: usize = wf
                .nodes
                .iter()
                .map(|n| wf.reporter_refs(&n.id).iter().filter(|r| **r == id).count())
                .sum();
            if uses <= 1 && graph.incoming_count(&id) == 0 && wf.node(&id).is_some() {
                for doomed in deletion_set(&wf, &graph, &[id]) {
                    session.remove_node_block(workflow, &doomed)?;
                }
            }
        }

        tracing::debug!(workflow, node_id = parent, path = %path.join("."), "deleted reporter");
        session.commit(None)
    }
}

/// Raw value at `path` under `node_id`, following `{node: id}` references.
fn value_at<'a>(workflow: &'a Workflow, node_id: &str, path: &[String]) -> Option<&'a RawValue> {
    let (first, rest) = path.split_first()?;
    let mut value = workflow.node(node_id)?.input(first)?;
    for key in rest {
        let inputs = match value {
            RawValue::Inline(inline) => &inline.inputs,
            RawValue::WorkflowCall { args, .. } => args,
            RawValue::NodeRef { id } => &workflow.node(id)?.inputs,
            _ => return None,
        };
        value = inputs.iter().find(|(k, _)| k == key).map(|(_, v)| v)?;
    }
    Some(value)
}

/// Number of `{node: id}` references to each id across the workflow.
fn reference_counts(workflow: &Workflow) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for node in &workflow.nodes {
        for id in workflow.reporter_refs(&node.id) {
            *counts.entry(id).or_insert(0) += 1;
        }
    }
    counts
}

/// Inline form of `id`, pulling in orphans only it references. Every node
/// folded in is recorded in `moved`.
fn inline_orphan(
    workflow: &Workflow,
    orphans: &HashSet<String>,
    uses: &HashMap<String, usize>,
    id: &str,
    moved: &mut Vec<String>,
) -> RawValue {
    moved.push(id.to_string());
    let Some(node) = workflow.node(id) else {
        return RawValue::NodeRef { id: id.to_string() };
    };
    let inputs = node
        .inputs
        .iter()
        .map(|(key, value)| (key.clone(), inline_value(workflow, orphans, uses, value, moved)))
        .collect();
    RawValue::Inline(InlineReporter {
        id: Some(id.to_string()),
        opcode: node.opcode.clone(),
        inputs,
    })
}

fn inline_value(
    workflow: &Workflow,
    orphans: &HashSet<String>,
    uses: &HashMap<String, usize>,
    value: &RawValue,
    moved: &mut Vec<String>,
) -> RawValue {
    match value {
        RawValue::NodeRef { id } if orphans.contains(id) && !moved.contains(id) && uses.get(id) == Some(&1) => {
            inline_orphan(workflow, orphans, uses, id, moved)
        }
        RawValue::Inline(inline) => RawValue::Inline(InlineReporter {
            id: inline.id.clone(),
            opcode: inline.opcode.clone(),
            inputs: inline
                .inputs
                .iter()
                .map(|(k, v)| (k.clone(), inline_value(workflow, orphans, uses, v, moved)))
                .collect(),
        }),
        RawValue::WorkflowCall { name, args } => RawValue::WorkflowCall {
            name: name.clone(),
            args: args
                .iter()
                .map(|(k, v)| (k.clone(), inline_value(workflow, orphans, uses, v, moved)))
                .collect(),
        },
        other => other.clone(),
    }
}
