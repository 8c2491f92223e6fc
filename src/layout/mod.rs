//! Layout phase: tree + drag offsets → canvas geometry.
//!
//! Pure and deterministic: identical inputs give identical geometry.

pub mod config;
pub mod connection;
mod flow;
pub mod sizing;
pub mod types;
pub mod viewport;

pub use config::LayoutConfig;
pub use connection::CubicPath;
pub use types::*;
pub use viewport::Viewport;

use std::collections::HashMap;

use crate::parse::{LinkSlot, Tree, TreeNode, WorkflowTree};
use flow::{Placed, place_chain, place_orphans};

pub fn layout(tree: &Tree, overrides: &LayoutOverrides, config: &LayoutConfig) -> Geometry {
    let mut workflows = Vec::with_capacity(tree.workflows.len());
    let mut top = 0.0;
    for wf in &tree.workflows {
        let (geometry, base_bottom) = layout_workflow(wf, top, overrides, config);
        workflows.push(geometry);
        top = base_bottom + config.group_padding + config.group_gap;
    }
    Geometry { workflows }
}

/// Geometry of one workflow group whose base layout starts at `top`, plus the
/// bottom of that base layout (offsets excluded) for stacking the next group.
fn layout_workflow(
    wf: &WorkflowTree,
    top: f64,
    overrides: &LayoutOverrides,
    config: &LayoutConfig,
) -> (WorkflowGeometry, f64) {
    let origin = Point::new(config.group_padding, top + config.group_padding);
    let mut placed = Vec::new();
    let chain = place_chain(&wf.nodes, origin, config, &mut placed);
    let mut base_bottom = chain.bottom;
    if !wf.orphans.is_empty() {
        let orphans = place_orphans(
            &wf.orphans,
            Point::new(origin.x, chain.bottom + config.orphan_gap),
            config,
            &mut placed,
        );
        base_bottom = orphans.bottom;
    }
    if placed.is_empty() {
        base_bottom = origin.y + config.header_height;
    }

    let group_offset = overrides.workflow_offset(&wf.name);
    let nodes: Vec<NodeGeometry> = placed
        .into_iter()
        .map(|p| {
            let shift = group_offset.offset(overrides.node_offset(&wf.name, &p.id));
            node_geometry(p, shift, config)
        })
        .collect();

    let bounds = match nodes.iter().map(|n| n.rect).reduce(Rect::union) {
        Some(covered) => covered.expand(config.group_padding),
        None => Rect::new(0.0, top, config.node_width, config.header_height)
            .expand(config.group_padding)
            .translate(Point::new(config.group_padding, config.group_padding))
            .translate(group_offset),
    };

    let connections = connections(wf, &nodes, config);
    let geometry = WorkflowGeometry {
        name: wf.name.clone(),
        bounds,
        offset: group_offset,
        nodes,
        connections,
    };
    (geometry, base_bottom)
}

fn node_geometry(p: Placed, shift: Point, config: &LayoutConfig) -> NodeGeometry {
    let rect = p.rect.translate(shift);
    let mid = rect.y + config.header_height / 2.0;
    let count = p.branches.len() as f64;
    let branch_ports = p
        .branches
        .into_iter()
        .enumerate()
        .map(|(i, name)| BranchPort {
            name,
            at: Point::new(rect.x + rect.width * (i as f64 + 1.0) / (count + 1.0), rect.bottom()),
        })
        .collect();
    NodeGeometry {
        id: p.id,
        rect,
        orphan: p.orphan,
        input_port: Point::new(rect.x, mid),
        output_port: Point::new(rect.right(), mid),
        branch_ports,
    }
}

fn connections(wf: &WorkflowTree, nodes: &[NodeGeometry], config: &LayoutConfig) -> Vec<ConnectionGeometry> {
    let by_id: HashMap<&str, &NodeGeometry> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut out = Vec::new();

    let mut link = |from: &str, to: &str, slot: LinkSlot, out: &mut Vec<ConnectionGeometry>| {
        let (Some(a), Some(b)) = (by_id.get(from), by_id.get(to)) else {
            return;
        };
        let start = match &slot {
            LinkSlot::Next => a.output_port,
            LinkSlot::Branch(name) => a
                .branch_ports
                .iter()
                .find(|p| &p.name == name)
                .map(|p| p.at)
                .unwrap_or(a.output_port),
        };
        out.push(ConnectionGeometry {
            from: from.to_string(),
            to: to.to_string(),
            path: CubicPath::between(start, b.input_port, config),
            slot,
        });
    };

    fn walk(
        chain: &[TreeNode],
        link: &mut dyn FnMut(&str, &str, LinkSlot, &mut Vec<ConnectionGeometry>),
        out: &mut Vec<ConnectionGeometry>,
    ) {
        for (i, node) in chain.iter().enumerate() {
            for branch in &node.children {
                if let Some(head) = branch.nodes.first() {
                    link(&node.id, &head.id, LinkSlot::Branch(branch.name.clone()), out);
                }
                walk(&branch.nodes, link, out);
            }
            if let Some(next) = chain.get(i + 1) {
                link(&node.id, &next.id, LinkSlot::Next, out);
            }
        }
    }

    walk(&wf.nodes, &mut link, &mut out);
    for orphan in &wf.orphans {
        if let Some(next) = &orphan.next {
            link(&orphan.node.id, next, LinkSlot::Next, &mut out);
        }
    }
    out
}
