//! Variable flow heuristic for a selected chain.
//!
//! Reads are variable references anywhere in a node's inputs; writes are the
//! names held by an opcode's assigning input. Computed or shadowed names are
//! not tracked.

use std::collections::HashSet;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::parse::{Tree, TreeNode};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainVariables {
    /// Read inside the chain before any write inside it.
    pub inputs: Vec<String>,
    /// Written inside the chain and read by some node outside it.
    pub outputs: Vec<String>,
    /// Written inside the chain and used nowhere else.
    pub locals: Vec<String>,
}

pub fn analyze_chain_variables(tree: &Tree, catalog: &Catalog, workflow: &str, ids: &[String]) -> ChainVariables {
    let Some(wf) = tree.workflow(workflow) else {
        return ChainVariables::default();
    };

    // The chain covers the selection and every branch descendant of it.
    let mut members: HashSet<&str> = HashSet::new();
    for id in ids {
        if let Some(node) = wf.find(id) {
            members.extend(node.subtree().into_iter().map(|n| n.id.as_str()));
        }
    }
    let all = wf.chain_nodes();
    let (inside, outside): (Vec<&TreeNode>, Vec<&TreeNode>) =
        all.into_iter().partition(|n| members.contains(n.id.as_str()));

    let mut result = ChainVariables::default();
    let mut written: Vec<String> = Vec::new();
    for node in &inside {
        for name in reads(node) {
            if !written.contains(&name) && !result.inputs.contains(&name) {
                result.inputs.push(name);
            }
        }
        if let Some(name) = writes(catalog, node) {
            if !written.contains(&name) {
                written.push(name);
            }
        }
    }

    let read_outside: HashSet<String> = outside
        .iter()
        .flat_map(|n| reads(n))
        .chain(wf.orphans.iter().flat_map(|o| reads(&o.node)))
        .collect();
    for name in written {
        if read_outside.contains(&name) {
            result.outputs.push(name);
        } else if !result.inputs.contains(&name) {
            result.locals.push(name);
        }
    }
    result
}

fn reads(node: &TreeNode) -> Vec<String> {
    node.inputs
        .iter()
        .flat_map(|slot| slot.value.variable_refs())
        .collect()
}

fn writes(catalog: &Catalog, node: &TreeNode) -> Option<String> {
    let param = catalog.get(&node.opcode)?.assigns.as_deref()?;
    node.input(param)
        .and_then(|v| v.as_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
