//! petgraph-based view of a workflow's `next` and branch pointers.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use serde::{Deserialize, Serialize};

use super::types::Workflow;
use crate::error::ParseError;

/// Which pointer of a node a link lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum LinkSlot {
    Next,
    Branch(String),
}

impl std::fmt::Display for LinkSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkSlot::Next => write!(f, "next"),
            LinkSlot::Branch(name) => write!(f, "branch {}", name),
        }
    }
}

pub struct LinkGraph {
    pub graph: DiGraph<String, LinkSlot>,
    pub node_indices: HashMap<String, NodeIndex>,
}

impl LinkGraph {
    pub fn build(workflow: &Workflow) -> Result<Self, ParseError> {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for node in &workflow.nodes {
            let idx = graph.add_node(node.id.clone());
            node_indices.insert(node.id.clone(), idx);
        }

        for node in &workflow.nodes {
            let source = node_indices[&node.id];
            let pointers = node
                .next
                .iter()
                .map(|t| (LinkSlot::Next, t))
                .chain(node.branches.iter().filter_map(|(name, head)| {
                    head.as_ref().map(|t| (LinkSlot::Branch(name.clone()), t))
                }));

            for (slot, target) in pointers {
                match node_indices.get(target) {
                    Some(&t) => {
                        graph.add_edge(source, t, slot);
                    }
                    None => {
                        return Err(ParseError::DanglingLink {
                            node_id: node.id.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }

        Ok(LinkGraph {
            graph,
            node_indices,
        })
    }

    /// Pointers into `node_id`, as `(source, slot)`, in insertion order.
    pub fn incoming(&self, node_id: &str) -> Vec<(&str, &LinkSlot)> {
        let Some(&idx) = self.node_indices.get(node_id) else {
            return vec![];
        };
        let mut links: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.id(), self.graph[e.source()].as_str(), e.weight()))
            .collect();
        links.sort_by_key(|(edge, _, _)| *edge);
        links.into_iter().map(|(_, s, w)| (s, w)).collect()
    }

    pub fn outgoing(&self, node_id: &str) -> Vec<(&str, &LinkSlot)> {
        let Some(&idx) = self.node_indices.get(node_id) else {
            return vec![];
        };
        let mut links: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), self.graph[e.target()].as_str(), e.weight()))
            .collect();
        links.sort_by_key(|(edge, _, _)| *edge);
        links.into_iter().map(|(_, t, w)| (t, w)).collect()
    }

    pub fn incoming_count(&self, node_id: &str) -> usize {
        self.incoming(node_id).len()
    }

    /// Whether `ancestor` can reach `node_id` by following pointers.
    pub fn is_ancestor(&self, ancestor: &str, node_id: &str) -> bool {
        match (self.node_indices.get(ancestor), self.node_indices.get(node_id)) {
            (Some(&a), Some(&n)) => has_path_connecting(&self.graph, a, n, None),
            _ => false,
        }
    }

    /// Every id reachable from `start`, `start` included.
    pub fn reachable_from(&self, start: &str) -> HashSet<String> {
        let mut reachable = HashSet::new();
        let Some(&idx) = self.node_indices.get(start) else {
            return reachable;
        };
        let mut bfs = Bfs::new(&self.graph, idx);
        while let Some(nx) = bfs.next(&self.graph) {
            reachable.insert(self.graph[nx].clone());
        }
        reachable
    }

    /// Ids reachable from `node_id` through its branch pointers only
    /// (the branch heads and everything that follows them).
    pub fn branch_descendants(&self, node_id: &str) -> HashSet<String> {
        let mut out = HashSet::new();
        for (head, slot) in self.outgoing(node_id) {
            if matches!(slot, LinkSlot::Branch(_)) {
                out.extend(self.reachable_from(head));
            }
        }
        out.remove(node_id);
        out
    }
}
