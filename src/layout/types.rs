use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::connection::CubicPath;
use crate::parse::LinkSlot;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn offset(self, by: Point) -> Point {
        Point::new(self.x + by.x, self.y + by.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn translate(self, by: Point) -> Rect {
        Rect::new(self.x + by.x, self.y + by.y, self.width, self.height)
    }

    /// Smallest rect covering both.
    pub fn union(self, other: Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(x, y, self.right().max(other.right()) - x, self.bottom().max(other.bottom()) - y)
    }

    pub fn expand(self, pad: f64) -> Rect {
        Rect::new(self.x - pad, self.y - pad, self.width + 2.0 * pad, self.height + 2.0 * pad)
    }
}

/// Manual drag offsets, applied on top of the automatic layout.
///
/// Only offsets are stored, so clearing them restores the automatic
/// positions exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutOverrides {
    #[serde(default)]
    pub workflows: BTreeMap<String, Point>,
    /// Workflow name → node id → offset.
    #[serde(default)]
    pub nodes: BTreeMap<String, BTreeMap<String, Point>>,
}

impl LayoutOverrides {
    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty() && self.nodes.values().all(BTreeMap::is_empty)
    }

    pub fn workflow_offset(&self, workflow: &str) -> Point {
        self.workflows.get(workflow).copied().unwrap_or_default()
    }

    pub fn node_offset(&self, workflow: &str, node_id: &str) -> Point {
        self.nodes
            .get(workflow)
            .and_then(|nodes| nodes.get(node_id))
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGeometry {
    pub id: String,
    pub rect: Rect,
    pub orphan: bool,
    pub input_port: Point,
    pub output_port: Point,
    /// One exit per branch, in slot order.
    pub branch_ports: Vec<BranchPort>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchPort {
    pub name: String,
    pub at: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionGeometry {
    pub from: String,
    pub to: String,
    pub slot: LinkSlot,
    pub path: CubicPath,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowGeometry {
    pub name: String,
    pub bounds: Rect,
    pub offset: Point,
    pub nodes: Vec<NodeGeometry>,
    pub connections: Vec<ConnectionGeometry>,
}

impl WorkflowGeometry {
    pub fn node(&self, id: &str) -> Option<&NodeGeometry> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    pub workflows: Vec<WorkflowGeometry>,
}

impl Geometry {
    pub fn workflow(&self, name: &str) -> Option<&WorkflowGeometry> {
        self.workflows.iter().find(|w| w.name == name)
    }
}
