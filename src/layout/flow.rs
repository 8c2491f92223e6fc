//! Automatic placement: chains run left to right, branches stack below their
//! control node, and the chain continues past the widest branch.

use super::config::LayoutConfig;
use super::sizing::node_height;
use super::types::{Point, Rect};
use crate::parse::{OrphanNode, TreeNode};

/// A card placed by the automatic layout, before any offsets.
#[derive(Debug, Clone)]
pub(crate) struct Placed {
    pub id: String,
    pub rect: Rect,
    pub orphan: bool,
    pub branches: Vec<String>,
}

/// Right and bottom edge reached by a placed run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Extent {
    pub right: f64,
    pub bottom: f64,
}

pub(crate) fn place_chain(nodes: &[TreeNode], origin: Point, config: &LayoutConfig, out: &mut Vec<Placed>) -> Extent {
    let mut extent = Extent {
        right: origin.x,
        bottom: origin.y,
    };
    let mut x = origin.x;

    for node in nodes {
        let rect = Rect::new(x, origin.y, config.node_width, node_height(node, config));
        out.push(Placed {
            id: node.id.clone(),
            rect,
            orphan: false,
            branches: node.children.iter().map(|b| b.name.clone()).collect(),
        });

        let mut right = rect.right();
        let mut bottom = rect.bottom();
        if node.is_control_flow() {
            let mut branch_y = rect.bottom() + config.branch_v_gap;
            for branch in &node.children {
                let reached = if branch.nodes.is_empty() {
                    // empty branches keep a drop row
                    Extent {
                        right: rect.right(),
                        bottom: branch_y + config.header_height,
                    }
                } else {
                    place_chain(&branch.nodes, Point::new(x, branch_y), config, out)
                };
                right = right.max(reached.right);
                bottom = bottom.max(reached.bottom);
                branch_y = reached.bottom + config.branch_v_gap;
            }
        }

        extent.right = extent.right.max(right);
        extent.bottom = extent.bottom.max(bottom);
        x = right + config.h_gap;
    }
    extent
}

/// One row of orphan cards starting at `origin`.
pub(crate) fn place_orphans(orphans: &[OrphanNode], origin: Point, config: &LayoutConfig, out: &mut Vec<Placed>) -> Extent {
    let mut extent = Extent {
        right: origin.x,
        bottom: origin.y,
    };
    let mut x = origin.x;
    for orphan in orphans {
        let rect = Rect::new(x, origin.y, config.node_width, node_height(&orphan.node, config));
        out.push(Placed {
            id: orphan.node.id.clone(),
            rect,
            orphan: true,
            branches: orphan.node.children.iter().map(|b| b.name.clone()).collect(),
        });
        extent.right = extent.right.max(rect.right());
        extent.bottom = extent.bottom.max(rect.bottom());
        x = rect.right() + config.h_gap;
    }
    extent
}
