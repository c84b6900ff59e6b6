//! Layout engine boundary. Given the flow graph and a canvas extent, an engine
//! assigns each node a depth and bounds and each link a width and endpoints.

mod sankey;

pub use sankey::LayeredFlowLayout;

use crate::ir::Graph;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Extent {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeLayout {
    pub depth: usize,
    pub value: f64,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl NodeLayout {
    pub fn center_y(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }
}

/// `y0` is the link centre where it leaves its source, `y1` where it enters
/// its target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkLayout {
    pub width: f64,
    pub y0: f64,
    pub y1: f64,
}

/// Engine output, index-aligned with `Graph::nodes` and `Graph::links`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowLayout {
    pub extent: Extent,
    pub nodes: Vec<NodeLayout>,
    pub links: Vec<LinkLayout>,
}

impl FlowLayout {
    pub fn empty(extent: Extent) -> Self {
        Self {
            extent,
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }
}

pub trait LayoutEngine {
    fn layout(&self, graph: &Graph, extent: Extent) -> FlowLayout;
}

/// Horizontal cubic link curve from the source's right edge to the target's
/// left edge. The control points can overshoot the extent for steep links.
pub fn link_path(graph: &Graph, layout: &FlowLayout, link_idx: usize) -> Option<String> {
    let link = graph.links.get(link_idx)?;
    let geometry = layout.links.get(link_idx)?;
    let source = layout.nodes.get(link.source)?;
    let target = layout.nodes.get(link.target)?;
    let x0 = source.x1;
    let x1 = target.x0;
    let mid = (x0 + x1) / 2.0;
    Some(format!(
        "M{x0:.2},{y0:.2}C{mid:.2},{y0:.2},{mid:.2},{y1:.2},{x1:.2},{y1:.2}",
        y0 = geometry.y0,
        y1 = geometry.y1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Link, Node};

    #[test]
    fn link_path_runs_between_node_edges() {
        let graph = Graph {
            nodes: vec![
                Node { id: "a".into(), name: "a".into() },
                Node { id: "b".into(), name: "b".into() },
            ],
            links: vec![Link { source: 0, target: 1, value: 1.0 }],
        };
        let layout = FlowLayout {
            extent: Extent::new(0.0, 0.0, 100.0, 100.0),
            nodes: vec![
                NodeLayout { depth: 0, value: 1.0, x0: 0.0, x1: 10.0, y0: 0.0, y1: 20.0 },
                NodeLayout { depth: 1, value: 1.0, x0: 90.0, x1: 100.0, y0: 40.0, y1: 60.0 },
            ],
            links: vec![LinkLayout { width: 20.0, y0: 10.0, y1: 50.0 }],
        };
        let d = link_path(&graph, &layout, 0).unwrap();
        assert_eq!(d, "M10.00,10.00C50.00,10.00,50.00,50.00,90.00,50.00");
        assert!(link_path(&graph, &layout, 1).is_none());
    }
}
