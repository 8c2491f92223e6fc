//! Tree recovery: walk each workflow from its start node, resolve inputs into
//! formatted values and classify everything left over as orphans.

use std::collections::HashSet;

use serde::Serialize;

use super::graph::LinkGraph;
use super::types::{NodeDefinition, RawValue, Workflow, WorkflowDocument};
use crate::catalog::{Catalog, Category};
use crate::error::ParseError;
use crate::value::{FormattedValue, InputSlot};

#[derive(Debug, Clone, Serialize)]
pub struct Tree {
    pub workflows: Vec<WorkflowTree>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTree {
    pub name: String,
    pub interface: super::types::Interface,
    pub variables: Vec<(String, serde_json::Value)>,
    /// Main chain, start node first.
    pub nodes: Vec<TreeNode>,
    pub orphans: Vec<OrphanNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub id: String,
    pub opcode: String,
    pub kind: Category,
    pub inputs: Vec<InputSlot>,
    pub children: Vec<BranchNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchNode {
    pub name: String,
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrphanNode {
    pub node: TreeNode,
    pub next: Option<String>,
}

impl Tree {
    pub fn workflow(&self, name: &str) -> Option<&WorkflowTree> {
        self.workflows.iter().find(|w| w.name == name)
    }
}

impl WorkflowTree {
    /// Find a chain node (main chain or any branch) by id.
    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        find_in(&self.nodes, id)
    }

    pub fn orphan(&self, id: &str) -> Option<&OrphanNode> {
        self.orphans.iter().find(|o| o.node.id == id)
    }

    pub fn orphan_ids(&self) -> Vec<&str> {
        self.orphans.iter().map(|o| o.node.id.as_str()).collect()
    }

    /// Chain nodes in depth-first order (a control node before its branches).
    pub fn chain_nodes(&self) -> Vec<&TreeNode> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.walk(&mut out);
        }
        out
    }

    /// Ids of chain nodes plus every reporter nested in their inputs.
    pub fn reachable_ids(&self) -> Vec<String> {
        let mut out = Vec::new();
        for node in self.chain_nodes() {
            out.push(node.id.clone());
            for slot in &node.inputs {
                out.extend(slot.value.reporter_ids());
            }
        }
        out
    }
}

fn find_in<'a>(nodes: &'a [TreeNode], id: &str) -> Option<&'a TreeNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        for branch in &node.children {
            if let Some(found) = find_in(&branch.nodes, id) {
                return Some(found);
            }
        }
    }
    None
}

impl TreeNode {
    pub fn input(&self, name: &str) -> Option<&FormattedValue> {
        self.inputs.iter().find(|s| s.name == name).map(|s| &s.value)
    }

    pub fn is_control_flow(&self) -> bool {
        self.kind == Category::ControlFlow
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a TreeNode>) {
        out.push(self);
        for branch in &self.children {
            for node in &branch.nodes {
                node.walk(out);
            }
        }
    }

    /// This node and all branch descendants, depth-first.
    pub fn subtree(&self) -> Vec<&TreeNode> {
        let mut out = Vec::new();
        self.walk(&mut out);
        out
    }
}

// =============================================================================
// BUILDER
// =============================================================================

pub fn build_tree(doc: &WorkflowDocument, catalog: &Catalog) -> Result<Tree, ParseError> {
    let workflows = doc
        .workflows
        .iter()
        .map(|w| TreeBuilder::new(doc, w, catalog).and_then(TreeBuilder::build))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Tree { workflows })
}

struct TreeBuilder<'a> {
    doc: &'a WorkflowDocument,
    workflow: &'a Workflow,
    catalog: &'a Catalog,
    /// Nodes reachable from start through pointers.
    chain: HashSet<String>,
    visited: HashSet<String>,
}

impl<'a> TreeBuilder<'a> {
    fn new(
        doc: &'a WorkflowDocument,
        workflow: &'a Workflow,
        catalog: &'a Catalog,
    ) -> Result<Self, ParseError> {
        let graph = LinkGraph::build(workflow)?;
        let chain = match workflow.start_id() {
            Some(start) => graph.reachable_from(start),
            None if workflow.nodes.is_empty() => HashSet::new(),
            None => return Err(ParseError::MissingStart(workflow.name.clone())),
        };
        Ok(TreeBuilder {
            doc,
            workflow,
            catalog,
            chain,
            visited: HashSet::new(),
        })
    }

    fn build(mut self) -> Result<WorkflowTree, ParseError> {
        let nodes = match self.workflow.start_id() {
            Some(start) => self.chain_from(Some(start.to_string()))?,
            None => Vec::new(),
        };

        let mut orphans = Vec::new();
        for def in &self.workflow.nodes {
            if self.visited.contains(&def.id) {
                continue;
            }
            let node = self.orphan_node(def)?;
            orphans.push(OrphanNode {
                node,
                next: def.next.clone(),
            });
        }

        tracing::trace!(
            workflow = %self.workflow.name,
            chain = self.chain.len(),
            orphans = orphans.len(),
            "built workflow tree"
        );

        Ok(WorkflowTree {
            name: self.workflow.name.clone(),
            interface: self.workflow.interface.clone(),
            variables: self
                .workflow
                .variables
                .iter()
                .map(|(k, v)| (k.clone(), yaml_to_json(v)))
                .collect(),
            nodes,
            orphans,
        })
    }

    fn chain_from(&mut self, head: Option<String>) -> Result<Vec<TreeNode>, ParseError> {
        let mut out = Vec::new();
        let mut cursor = head;
        while let Some(id) = cursor {
            if self.visited.contains(&id) {
                break;
            }
            let def = self.definition(&id)?;
            self.visited.insert(id.clone());
            out.push(self.chain_node(def)?);
            cursor = def.next.clone();
        }
        Ok(out)
    }

    fn chain_node(&mut self, def: &'a NodeDefinition) -> Result<TreeNode, ParseError> {
        let mut node = self.plain_node(def, true)?;

        if self.catalog.is_control_flow(&def.opcode) {
            let present = def.branch_names();
            let slots = self.catalog.branch_slots(&def.opcode, &present);
            if let Some(unknown) = present.iter().find(|n| !slots.iter().any(|s| s == *n)) {
                return Err(ParseError::UnknownBranch {
                    node_id: def.id.clone(),
                    branch: unknown.to_string(),
                });
            }
            for slot in slots {
                let head = def.branch(&slot).cloned().flatten();
                let nodes = self.chain_from(head)?;
                node.children.push(BranchNode { name: slot, nodes });
            }
        } else if let Some((name, _)) = def.branches.iter().find(|(_, head)| head.is_some()) {
            return Err(ParseError::UnknownBranch {
                node_id: def.id.clone(),
                branch: name.clone(),
            });
        }

        Ok(node)
    }

    fn orphan_node(&mut self, def: &'a NodeDefinition) -> Result<TreeNode, ParseError> {
        self.plain_node(def, false)
    }

    fn plain_node(&mut self, def: &'a NodeDefinition, in_chain: bool) -> Result<TreeNode, ParseError> {
        let kind = self.known_opcode(&def.id, &def.opcode)?;
        let mut ancestors = vec![def.id.clone()];
        let inputs = self.resolve_inputs(&def.id, &def.inputs, &mut ancestors, in_chain)?;
        Ok(TreeNode {
            id: def.id.clone(),
            opcode: def.opcode.clone(),
            kind,
            inputs,
            children: Vec::new(),
        })
    }

    fn resolve_inputs(
        &mut self,
        owner: &str,
        inputs: &'a [(String, RawValue)],
        ancestors: &mut Vec<String>,
        in_chain: bool,
    ) -> Result<Vec<InputSlot>, ParseError> {
        inputs
            .iter()
            .map(|(name, raw)| {
                let value = self.resolve(owner, name, raw, ancestors, in_chain)?;
                Ok(InputSlot {
                    name: name.clone(),
                    value,
                })
            })
            .collect()
    }

    fn resolve(
        &mut self,
        owner: &str,
        input: &str,
        raw: &'a RawValue,
        ancestors: &mut Vec<String>,
        in_chain: bool,
    ) -> Result<FormattedValue, ParseError> {
        match raw {
            RawValue::Literal { value } => Ok(FormattedValue::Literal {
                value: yaml_to_json(value),
            }),
            RawValue::Variable { name } => Ok(FormattedValue::Variable { name: name.clone() }),
            RawValue::NodeRef { id } => {
                if ancestors.contains(id) {
                    return Err(ParseError::CyclicReporter { node_id: id.clone() });
                }
                if in_chain && self.chain.contains(id) {
                    return Err(ParseError::malformed(
                        owner,
                        format!("input '{}' uses chain node '{}' as a reporter", input, id),
                    ));
                }
                let def = self.workflow.node(id).ok_or_else(|| ParseError::DanglingLink {
                    node_id: owner.to_string(),
                    target: id.clone(),
                })?;
                if in_chain {
                    self.visited.insert(id.clone());
                }
                self.reporter(&def.id, &def.opcode, &def.inputs, ancestors, in_chain)
            }
            RawValue::Inline(inline) => {
                let id = inline
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("{}__{}", owner, input));
                if ancestors.contains(&id) {
                    return Err(ParseError::CyclicReporter { node_id: id });
                }
                self.reporter(&id, &inline.opcode, &inline.inputs, ancestors, in_chain)
            }
            RawValue::WorkflowCall { name, args } => {
                if self.doc.workflow(name).is_none() {
                    return Err(ParseError::UnknownWorkflow {
                        node_id: owner.to_string(),
                        workflow: name.clone(),
                    });
                }
                let args = self.resolve_inputs(owner, args, ancestors, in_chain)?;
                Ok(FormattedValue::WorkflowCall {
                    name: name.clone(),
                    args,
                })
            }
        }
    }

    fn reporter(
        &mut self,
        id: &str,
        opcode: &str,
        inputs: &'a [(String, RawValue)],
        ancestors: &mut Vec<String>,
        in_chain: bool,
    ) -> Result<FormattedValue, ParseError> {
        self.known_opcode(id, opcode)?;
        ancestors.push(id.to_string());
        let resolved = self.resolve_inputs(id, inputs, ancestors, in_chain);
        ancestors.pop();
        Ok(FormattedValue::Reporter {
            opcode: opcode.to_string(),
            id: id.to_string(),
            inputs: resolved?,
        })
    }

    fn known_opcode(&self, node_id: &str, opcode: &str) -> Result<Category, ParseError> {
        match self.catalog.get(opcode) {
            Some(spec) => Ok(spec.category),
            None => Err(ParseError::UnknownOpcode {
                node_id: node_id.to_string(),
                opcode: opcode.to_string(),
            }),
        }
    }

    fn definition(&self, id: &str) -> Result<&'a NodeDefinition, ParseError> {
        self.workflow
            .node(id)
            .ok_or_else(|| ParseError::DanglingLink {
                node_id: self.workflow.name.clone(),
                target: id.to_string(),
            })
    }
}

pub(crate) fn yaml_to_json(value: &serde_yaml::Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}
