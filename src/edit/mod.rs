//! Edit phase: structural graph edits realized as line-range surgery on the
//! document text.
//!
//! Every operation takes the current text plus its arguments and returns the
//! new text. Nothing is written on failure: the caller keeps the original.
//! Node blocks are always re-located by id right before they are touched, so
//! several splices in one operation never act on stale line numbers.

mod dynamic;
mod extract;
mod ids;
mod links;
mod locate;
mod nodes;
mod reporters;
mod variables;
mod workflows;
mod writer;

pub use extract::Extraction;
pub use ids::{IdAllocator, generate_unique_id};
pub use locate::NodeLocation;
pub use nodes::{AddNode, InsertPoint};

use std::collections::HashSet;

use serde::Serialize;

use crate::catalog::{Catalog, default_literal, ordinal_suffix, BranchSlots};
use crate::error::EditError;
use crate::parse::{LinkGraph, LinkSlot, RawValue, Workflow, WorkflowDocument, load_document};
use locate::TextBuffer;
use writer::{inline_scalar, render_string};

/// Result of a successful edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edit {
    pub text: String,
    /// Id of the node the edit created, when it created one.
    pub node_id: Option<String>,
}

/// Structural editor over document text.
///
/// Holds only the opcode catalog; the document is always passed in.
#[derive(Debug, Clone, Default)]
pub struct DocumentEditor {
    catalog: Catalog,
}

impl DocumentEditor {
    pub fn new(catalog: Catalog) -> Self {
        DocumentEditor { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Line extent and indent of a node entry.
    pub fn locate_node(&self, text: &str, workflow: &str, node_id: &str) -> Result<NodeLocation, EditError> {
        let session = self.session(text)?;
        session.node_location(workflow, node_id)
    }

    /// Line extent and indent of a workflow item, `- name:` line included.
    pub fn locate_workflow(&self, text: &str, workflow: &str) -> Result<NodeLocation, EditError> {
        let session = self.session(text)?;
        let start = session.workflow_line(workflow)?;
        Ok(NodeLocation {
            start,
            end: session.buf.block_end(start),
            indent: session.buf.indent(start).unwrap_or(0),
        })
    }

    fn session(&self, text: &str) -> Result<Session<'_>, EditError> {
        Session::open(text, &self.catalog)
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// One edit in progress: the document as loaded before the edit and the
/// buffer being spliced.
pub(crate) struct Session<'c> {
    doc: WorkflowDocument,
    buf: TextBuffer,
    catalog: &'c Catalog,
    ids: IdAllocator,
}

impl<'c> Session<'c> {
    fn open(text: &str, catalog: &'c Catalog) -> Result<Self, EditError> {
        let doc = load_document(text)?;
        Ok(Session {
            doc,
            buf: TextBuffer::new(text),
            catalog,
            ids: IdAllocator::new(),
        })
    }

    fn workflow(&self, name: &str) -> Result<Workflow, EditError> {
        self.doc
            .workflow(name)
            .cloned()
            .ok_or_else(|| EditError::WorkflowNotFound(name.to_string()))
    }

    fn graph(&self, workflow: &Workflow) -> Result<LinkGraph, EditError> {
        Ok(LinkGraph::build(workflow)?)
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.ids.allocate_in(&self.doc, prefix)
    }

    fn workflow_line(&self, name: &str) -> Result<usize, EditError> {
        self.buf
            .locate_workflow(name)
            .ok_or_else(|| EditError::WorkflowNotFound(name.to_string()))
    }

    fn node_location(&self, workflow: &str, node_id: &str) -> Result<NodeLocation, EditError> {
        let line = self.workflow_line(workflow)?;
        self.buf
            .locate_node(line, node_id)
            .ok_or_else(|| EditError::node_not_found(workflow, node_id))
    }

    fn node_line(&self, workflow: &str, node_id: &str) -> Result<usize, EditError> {
        Ok(self.node_location(workflow, node_id)?.start)
    }

    /// Point `from`'s `slot` at `target`, or clear it.
    fn set_pointer(
        &mut self,
        workflow: &str,
        from: &str,
        slot: &LinkSlot,
        target: Option<&str>,
    ) -> Result<(), EditError> {
        let keep_slot = match slot {
            LinkSlot::Branch(name) => self.is_dynamic_branch(workflow, from, name),
            LinkSlot::Next => false,
        };
        let node = self.node_line(workflow, from)?;
        match (slot, target) {
            (LinkSlot::Next, Some(t)) => self.buf.set_scalar(node, "next", &render_string(t)),
            (LinkSlot::Next, None) => {
                self.buf.remove_entry(node, "next");
            }
            (LinkSlot::Branch(name), Some(t)) => {
                let branches = self.buf.ensure_block(node, "branches");
                self.buf.set_scalar(branches, name, &render_string(t));
            }
            (LinkSlot::Branch(name), None) => {
                if let Some(branches) = self.buf.find_entry(node, "branches") {
                    if keep_slot {
                        if self.buf.find_entry(branches, name).is_some() {
                            self.buf.set_scalar(branches, name, "null");
                        }
                    } else {
                        self.buf.remove_entry(branches, name);
                        if self.buf.entries(branches).is_empty() && self.buf.raw_value(branches).unwrap_or_default().is_empty() {
                            self.buf.remove_entry(node, "branches");
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn is_dynamic_branch(&self, workflow: &str, node_id: &str, name: &str) -> bool {
        let Some(opcode) = self
            .doc
            .workflow(workflow)
            .and_then(|w| w.node(node_id))
            .map(|n| n.opcode.as_str())
        else {
            return false;
        };
        match self.catalog.get(opcode).and_then(|s| s.branches.as_ref()) {
            Some(BranchSlots::Dynamic { prefix, .. }) => ordinal_suffix(name, prefix).is_some(),
            _ => false,
        }
    }

    /// Splice a node block (given relative to column 0, header line first)
    /// after `after`'s block, or at the end of the node map.
    fn insert_node_block(&mut self, workflow: &str, after: Option<&str>, block: Vec<String>) -> Result<(), EditError> {
        let (at, indent) = match after {
            Some(id) => {
                let loc = self.node_location(workflow, id)?;
                (loc.end, loc.indent)
            }
            None => {
                let wf = self.workflow_line(workflow)?;
                let nodes = self.buf.ensure_block(wf, "nodes");
                (self.buf.block_end(nodes), self.buf.entry_indent(nodes))
            }
        };
        self.buf.insert(at, locate::indent_lines(block, indent));
        Ok(())
    }

    fn remove_node_block(&mut self, workflow: &str, node_id: &str) -> Result<Vec<String>, EditError> {
        let loc = self.node_location(workflow, node_id)?;
        let removed = self.buf.slice(loc.start..loc.end);
        let blank = |buf: &TextBuffer, i: usize| buf.line(i).trim().is_empty();
        let end = if loc.start > 0
            && blank(&self.buf, loc.start - 1)
            && loc.end < self.buf.len()
            && blank(&self.buf, loc.end)
        {
            loc.end + 1
        } else {
            loc.end
        };
        self.buf.remove(loc.start..end);
        Ok(removed)
    }

    /// Line of the `inputs:`/`args:` block holding the slot at `path`, the
    /// slot key, and the opcode owning it. Descends through inline reporter
    /// blocks, call blocks and `{node: id}` references.
    fn input_slot(
        &self,
        workflow: &Workflow,
        node_id: &str,
        path: &[String],
    ) -> Result<(usize, String, String), EditError> {
        let not_found = |input: &str| EditError::TargetInputNotFound {
            node_id: node_id.to_string(),
            input: input.to_string(),
        };
        let (last, parents) = path.split_last().ok_or_else(|| not_found(""))?;

        let mut block = self.node_line(&workflow.name, node_id)?;
        let mut opcode = workflow
            .node(node_id)
            .map(|n| n.opcode.clone())
            .ok_or_else(|| EditError::node_not_found(&workflow.name, node_id))?;

        for key in parents {
            let container = self
                .buf
                .find_entry(block, "inputs")
                .or_else(|| self.buf.find_entry(block, "args"))
                .ok_or_else(|| not_found(key))?;
            let slot = self.buf.find_entry(container, key).ok_or_else(|| not_found(key))?;

            if let Some(reference) = self.buf.find_entry(slot, "node") {
                let target = self.buf.scalar_value(reference).ok_or_else(|| not_found(key))?;
                block = self.node_line(&workflow.name, &target)?;
                opcode = workflow
                    .node(&target)
                    .map(|n| n.opcode.clone())
                    .unwrap_or_default();
            } else if let Some(op) = self.buf.find_entry(slot, "opcode") {
                opcode = self.buf.scalar_value(op).unwrap_or_default();
                block = slot;
            } else if self.buf.find_entry(slot, "workflow_call").is_some() {
                opcode = String::new();
                block = slot;
            } else {
                return Err(not_found(key));
            }
        }

        let container = self
            .buf
            .find_entry(block, "inputs")
            .or_else(|| self.buf.find_entry(block, "args"))
            .ok_or_else(|| not_found(last))?;
        if self.buf.find_entry(container, last).is_none() {
            return Err(not_found(last));
        }
        Ok((container, last.clone(), opcode))
    }

    /// Replace the slot at `path` with the default literal of its type.
    fn reset_input(&mut self, workflow: &Workflow, node_id: &str, path: &[String]) -> Result<(), EditError> {
        let (container, key, opcode) = self.input_slot(workflow, node_id, path)?;
        let ty = self
            .catalog
            .get(&opcode)
            .and_then(|s| s.input_type(&key))
            .unwrap_or("str");
        let literal = inline_scalar(&default_literal(ty)).unwrap_or_else(|| "null".into());
        self.buf.set_block(container, &key, vec![format!("literal: {}", literal)]);
        Ok(())
    }

    /// Point the slot at `path` at another node map entry.
    fn set_reference(&mut self, workflow: &Workflow, node_id: &str, path: &[String], target: &str) -> Result<(), EditError> {
        let (container, key, _) = self.input_slot(workflow, node_id, path)?;
        self.buf.set_block(container, &key, vec![format!("node: {}", render_string(target))]);
        Ok(())
    }

    fn commit(self, node_id: Option<String>) -> Result<Edit, EditError> {
        let text = self.buf.into_text();
        if let Err(e) = load_document(&text) {
            tracing::warn!(error = %e, "edit produced an unreadable document; discarding it");
            return Err(EditError::Corrupted(e.to_string()));
        }
        Ok(Edit { text, node_id })
    }
}

// =============================================================================
// SHARED ANALYSIS
// =============================================================================

/// Input paths (`[KEY, NESTED, ...]`) under which `node` references `{node: id}`.
pub(crate) fn reference_paths(workflow: &Workflow, node_id: &str) -> Vec<(Vec<String>, String)> {
    fn walk(inputs: &[(String, RawValue)], prefix: &mut Vec<String>, out: &mut Vec<(Vec<String>, String)>) {
        for (key, value) in inputs {
            prefix.push(key.clone());
            match value {
                RawValue::NodeRef { id } => out.push((prefix.clone(), id.clone())),
                RawValue::Inline(inline) => walk(&inline.inputs, prefix, out),
                RawValue::WorkflowCall { args, .. } => walk(args, prefix, out),
                _ => {}
            }
            prefix.pop();
        }
    }
    let mut out = Vec::new();
    if let Some(node) = workflow.node(node_id) {
        walk(&node.inputs, &mut Vec::new(), &mut out);
    }
    out
}

/// Node-map ids reachable neither through pointers from start nor as
/// reporters referenced from a reachable node.
pub(crate) fn orphan_ids(workflow: &Workflow, graph: &LinkGraph) -> HashSet<String> {
    let mut reached = match workflow.start_id() {
        Some(start) => graph.reachable_from(start),
        None => HashSet::new(),
    };
    let mut pending: Vec<String> = reached.iter().cloned().collect();
    while let Some(id) = pending.pop() {
        for reporter in workflow.reporter_refs(&id) {
            if reached.insert(reporter.clone()) {
                pending.push(reporter);
            }
        }
    }
    workflow
        .nodes
        .iter()
        .filter(|n| !reached.contains(&n.id))
        .map(|n| n.id.clone())
        .collect()
}

/// Everything that disappears with `roots`: the roots, their branch subtrees,
/// and by-reference reporters no surviving node still uses.
pub(crate) fn deletion_set(workflow: &Workflow, graph: &LinkGraph, roots: &[String]) -> Vec<String> {
    let mut doomed: HashSet<String> = HashSet::new();
    for root in roots {
        doomed.insert(root.clone());
        doomed.extend(graph.branch_descendants(root));
    }

    loop {
        let mut grew = false;
        let candidates: Vec<String> = doomed
            .iter()
            .flat_map(|id| workflow.reporter_refs(id))
            .filter(|r| !doomed.contains(r))
            .collect();
        for candidate in candidates {
            let used_elsewhere = workflow
                .nodes
                .iter()
                .filter(|n| !doomed.contains(&n.id))
                .any(|n| workflow.reporter_refs(&n.id).contains(&candidate));
            let in_chain = graph.incoming_count(&candidate) > 0;
            if !used_elsewhere && !in_chain && doomed.insert(candidate) {
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    workflow
        .nodes
        .iter()
        .filter(|n| doomed.contains(&n.id))
        .map(|n| n.id.clone())
        .collect()
}
