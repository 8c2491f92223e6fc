//! Linear chain validation for extraction.
//!
//! A selection is extractable when it forms one contiguous run inside a single
//! container (the main chain or one branch) and nothing selected leaks out of
//! that run into some other branch.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::parse::{Tree, TreeNode, WorkflowTree};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainValidation {
    pub is_valid: bool,
    /// Selected nodes of the run, in chain order.
    pub ordered_node_ids: Vec<String>,
    /// Selected nodes that live inside branches of run nodes.
    pub nested_ids: Vec<String>,
    pub first_id: Option<String>,
    pub last_id: Option<String>,
    pub predecessor_id: Option<String>,
    pub successor_id: Option<String>,
    pub errors: Vec<String>,
}

impl ChainValidation {
    fn invalid(errors: Vec<String>) -> Self {
        ChainValidation {
            is_valid: false,
            ordered_node_ids: Vec::new(),
            nested_ids: Vec::new(),
            first_id: None,
            last_id: None,
            predecessor_id: None,
            successor_id: None,
            errors,
        }
    }
}

/// Where a chain node sits: owning control node and branch (None for the
/// main chain), index within that container, and nesting depth.
#[derive(Debug, Clone)]
struct Placement {
    container: Option<(String, String)>,
    index: usize,
    depth: usize,
}

/// Validate that `ids` can be lifted out of `workflow` as one linear run.
/// Every problem found is reported, not just the first.
pub fn validate_linear_chain(tree: &Tree, ids: &[String], workflow: &str) -> ChainValidation {
    let Some(wf) = tree.workflow(workflow) else {
        return ChainValidation::invalid(vec![format!("Workflow '{}' not found", workflow)]);
    };
    if ids.is_empty() {
        return ChainValidation::invalid(vec!["No nodes selected".into()]);
    }

    let placements = place_nodes(wf);
    let mut errors = Vec::new();
    let mut selected: Vec<&str> = Vec::new();
    for id in ids {
        if placements.contains_key(id.as_str()) {
            if !selected.contains(&id.as_str()) {
                selected.push(id);
            }
        } else if wf.orphan(id).is_some() {
            errors.push(format!("Node '{}' is an orphan and not part of the chain", id));
        } else {
            errors.push(format!("Node '{}' not found in workflow '{}'", id, workflow));
        }
    }
    if selected.is_empty() {
        return ChainValidation::invalid(errors);
    }

    // Anchor: the shallowest selected node, earliest in chain order on ties.
    let order: HashMap<&str, usize> = wf
        .chain_nodes()
        .into_iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();
    let anchor = selected
        .iter()
        .copied()
        .min_by_key(|id| (placements[id].depth, order[id]))
        .unwrap_or(selected[0]);
    let container = placements[anchor].container.clone();
    let siblings = container_nodes(wf, &container);

    let mut run: Vec<&TreeNode> = siblings
        .iter()
        .copied()
        .filter(|n| selected.contains(&n.id.as_str()))
        .collect();
    run.sort_by_key(|n| placements[n.id.as_str()].index);

    if let Some(start) = wf.nodes.first() {
        if run.iter().any(|n| n.id == start.id) {
            errors.push(format!(
                "Start node '{}' cannot be extracted: it has no predecessor",
                start.id
            ));
        }
    }

    for pair in run.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if placements[b.id.as_str()].index != placements[a.id.as_str()].index + 1 {
            errors.push(format!(
                "Selection is not contiguous: gap between '{}' and '{}'",
                a.id, b.id
            ));
        }
    }

    // Everything inside branches of run nodes travels with the run.
    let mut inside: HashSet<&str> = HashSet::new();
    for node in &run {
        for descendant in node.subtree().into_iter().skip(1) {
            inside.insert(&descendant.id);
        }
    }
    let run_ids: HashSet<&str> = run.iter().map(|n| n.id.as_str()).collect();
    let mut nested_ids = Vec::new();
    for id in &selected {
        if run_ids.contains(id) {
            continue;
        }
        if inside.contains(id) {
            nested_ids.push(id.to_string());
        } else {
            let (owner, branch) = placements[id]
                .container
                .clone()
                .unwrap_or_else(|| (String::new(), String::new()));
            errors.push(format!(
                "Branch leakage: '{}' sits in branch {} of '{}', outside the selected run",
                id, branch, owner
            ));
        }
    }

    for node in run.iter().filter(|n| n.is_control_flow()) {
        let contents: Vec<&str> = node
            .subtree()
            .into_iter()
            .skip(1)
            .map(|n| n.id.as_str())
            .collect();
        let picked = contents.iter().filter(|id| selected.contains(*id)).count();
        if picked > 0 && picked < contents.len() {
            errors.push(format!(
                "Branch leakage: branch contents of '{}' are only partly selected",
                node.id
            ));
        }
    }

    let first = run.first().map(|n| n.id.clone());
    let last = run.last().map(|n| n.id.clone());
    let predecessor_id = run.first().and_then(|n| {
        let index = placements[n.id.as_str()].index;
        if index > 0 {
            Some(siblings[index - 1].id.clone())
        } else {
            container.as_ref().map(|(owner, _)| owner.clone())
        }
    });
    let successor_id = run.last().and_then(|n| {
        let index = placements[n.id.as_str()].index;
        siblings.get(index + 1).map(|s| s.id.clone())
    });

    ChainValidation {
        is_valid: errors.is_empty(),
        ordered_node_ids: run.iter().map(|n| n.id.clone()).collect(),
        nested_ids,
        first_id: first,
        last_id: last,
        predecessor_id,
        successor_id,
        errors,
    }
}

fn place_nodes(wf: &WorkflowTree) -> HashMap<&str, Placement> {
    fn walk<'a>(
        nodes: &'a [TreeNode],
        container: Option<(String, String)>,
        depth: usize,
        out: &mut HashMap<&'a str, Placement>,
    ) {
        for (index, node) in nodes.iter().enumerate() {
            out.insert(
                &node.id,
                Placement {
                    container: container.clone(),
                    index,
                    depth,
                },
            );
            for branch in &node.children {
                walk(
                    &branch.nodes,
                    Some((node.id.clone(), branch.name.clone())),
                    depth + 1,
                    out,
                );
            }
        }
    }
    let mut out = HashMap::new();
    walk(&wf.nodes, None, 0, &mut out);
    out
}

fn container_nodes<'a>(wf: &'a WorkflowTree, container: &Option<(String, String)>) -> Vec<&'a TreeNode> {
    match container {
        None => wf.nodes.iter().collect(),
        Some((owner, branch)) => wf
            .find(owner)
            .and_then(|o| o.children.iter().find(|b| &b.name == branch))
            .map(|b| b.nodes.iter().collect())
            .unwrap_or_default(),
    }
}
