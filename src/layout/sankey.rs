use tracing::warn;

use crate::ir::Graph;

use super::{Extent, FlowLayout, LayoutEngine, LinkLayout, NodeLayout};

/// Left-aligned layered flow layout.
///
/// Nodes are stacked per depth in graph order and links are stacked per node
/// in link order; neither is re-sorted, so the caller's row order decides the
/// stacking of equal-depth nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayeredFlowLayout {
    pub node_width: f64,
    pub node_padding: f64,
    pub iterations: usize,
}

impl Default for LayeredFlowLayout {
    fn default() -> Self {
        Self {
            node_width: 12.0,
            node_padding: 42.0,
            iterations: 6,
        }
    }
}

impl LayoutEngine for LayeredFlowLayout {
    fn layout(&self, graph: &Graph, extent: Extent) -> FlowLayout {
        let node_count = graph.nodes.len();
        if node_count == 0 {
            return FlowLayout::empty(extent);
        }

        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        let mut in_total = vec![0.0f64; node_count];
        let mut out_total = vec![0.0f64; node_count];
        for (link_idx, link) in graph.links.iter().enumerate() {
            if link.source >= node_count || link.target >= node_count {
                continue;
            }
            outgoing[link.source].push(link_idx);
            incoming[link.target].push(link_idx);
            out_total[link.source] += link.value;
            in_total[link.target] += link.value;
        }
        let values: Vec<f64> = (0..node_count)
            .map(|idx| in_total[idx].max(out_total[idx]))
            .collect();

        let depths = compute_depths(graph, &outgoing);
        let max_depth = depths.iter().copied().max().unwrap_or(0);
        let column_count = max_depth + 1;
        let mut columns: Vec<Vec<usize>> = vec![Vec::new(); column_count];
        for (idx, &depth) in depths.iter().enumerate() {
            columns[depth].push(idx);
        }

        let kx = if column_count > 1 {
            ((extent.width() - self.node_width) / (column_count - 1) as f64).max(0.0)
        } else {
            0.0
        };
        let height = extent.height();
        let max_len = columns.iter().map(Vec::len).max().unwrap_or(0);
        let py = if max_len <= 1 {
            self.node_padding
        } else {
            self.node_padding.min(height / (max_len - 1) as f64)
        };

        let mut ky = f64::INFINITY;
        for column in &columns {
            let sum: f64 = column.iter().map(|&idx| values[idx]).sum();
            if sum <= 0.0 {
                continue;
            }
            let available = height - (column.len() as f64 - 1.0) * py;
            ky = ky.min(available / sum);
        }
        if !ky.is_finite() || ky < 0.0 {
            ky = 0.0;
        }

        let mut nodes: Vec<NodeLayout> = (0..node_count)
            .map(|idx| {
                let x0 = extent.x0 + depths[idx] as f64 * kx;
                NodeLayout {
                    depth: depths[idx],
                    value: values[idx],
                    x0,
                    x1: x0 + self.node_width,
                    y0: 0.0,
                    y1: 0.0,
                }
            })
            .collect();

        for column in &columns {
            let mut y = extent.y0;
            for &idx in column {
                nodes[idx].y0 = y;
                nodes[idx].y1 = y + values[idx] * ky;
                y = nodes[idx].y1 + py;
            }
            let spare = (extent.y1 - y + py) / (column.len() as f64 + 1.0);
            for (pos, &idx) in column.iter().enumerate() {
                let shift = spare * (pos as f64 + 1.0);
                nodes[idx].y0 += shift;
                nodes[idx].y1 += shift;
            }
        }

        for iteration in 0..self.iterations {
            let alpha = 0.99f64.powi(iteration as i32);
            let beta = (1.0 - alpha).max((iteration as f64 + 1.0) / self.iterations as f64);
            for column in columns.iter().rev().skip(1) {
                relax(graph, &mut nodes, column, &outgoing, Side::Target, alpha);
                resolve_collisions(&mut nodes, column, py, extent, beta);
            }
            for column in columns.iter().skip(1) {
                relax(graph, &mut nodes, column, &incoming, Side::Source, alpha);
                resolve_collisions(&mut nodes, column, py, extent, beta);
            }
        }

        let mut links: Vec<LinkLayout> = graph
            .links
            .iter()
            .map(|link| LinkLayout {
                width: link.value.max(0.0) * ky,
                y0: 0.0,
                y1: 0.0,
            })
            .collect();
        for idx in 0..node_count {
            let mut y = nodes[idx].y0;
            for &link_idx in &outgoing[idx] {
                links[link_idx].y0 = y + links[link_idx].width / 2.0;
                y += links[link_idx].width;
            }
            let mut y = nodes[idx].y0;
            for &link_idx in &incoming[idx] {
                links[link_idx].y1 = y + links[link_idx].width / 2.0;
                y += links[link_idx].width;
            }
        }

        FlowLayout {
            extent,
            nodes,
            links,
        }
    }
}

/// Depth of every node: the length of the longest link chain reaching it.
fn compute_depths(graph: &Graph, outgoing: &[Vec<usize>]) -> Vec<usize> {
    let node_count = outgoing.len();
    let mut depths = vec![0usize; node_count];
    let mut current: Vec<usize> = (0..node_count).collect();
    let mut seen = vec![false; node_count];
    let mut depth = 0usize;
    while !current.is_empty() {
        if depth > node_count {
            warn!("circular flow detected, depths truncated");
            break;
        }
        let mut next = Vec::new();
        seen.fill(false);
        for &idx in &current {
            depths[idx] = depth;
            for &link_idx in &outgoing[idx] {
                let target = graph.links[link_idx].target;
                if !seen[target] {
                    seen[target] = true;
                    next.push(target);
                }
            }
        }
        current = next;
        depth += 1;
    }
    depths
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Source,
    Target,
}

/// Pulls each node in `column` toward the value-weighted centre of its
/// neighbours on `side`.
fn relax(
    graph: &Graph,
    nodes: &mut [NodeLayout],
    column: &[usize],
    adjacency: &[Vec<usize>],
    side: Side,
    alpha: f64,
) {
    for &idx in column {
        let mut weighted = 0.0;
        let mut weight = 0.0;
        for &link_idx in &adjacency[idx] {
            let link = &graph.links[link_idx];
            let other = match side {
                Side::Source => link.source,
                Side::Target => link.target,
            };
            weighted += nodes[other].center_y() * link.value;
            weight += link.value;
        }
        if weight <= 0.0 {
            continue;
        }
        let dy = (weighted / weight - nodes[idx].center_y()) * alpha;
        nodes[idx].y0 += dy;
        nodes[idx].y1 += dy;
    }
}

fn resolve_collisions(
    nodes: &mut [NodeLayout],
    column: &[usize],
    py: f64,
    extent: Extent,
    alpha: f64,
) {
    if column.is_empty() {
        return;
    }
    let mid = column.len() >> 1;
    let subject = nodes[column[mid]];
    push_up(nodes, &column[..mid], subject.y0 - py, py, alpha);
    push_down(nodes, &column[mid + 1..], subject.y1 + py, py, alpha);
    push_up(nodes, column, extent.y1, py, alpha);
    push_down(nodes, column, extent.y0, py, alpha);
}

fn push_down(nodes: &mut [NodeLayout], column: &[usize], mut y: f64, py: f64, alpha: f64) {
    for &idx in column {
        let dy = (y - nodes[idx].y0) * alpha;
        if dy > 1e-6 {
            nodes[idx].y0 += dy;
            nodes[idx].y1 += dy;
        }
        y = nodes[idx].y1 + py;
    }
}

fn push_up(nodes: &mut [NodeLayout], column: &[usize], mut y: f64, py: f64, alpha: f64) {
    for &idx in column.iter().rev() {
        let dy = (nodes[idx].y1 - y) * alpha;
        if dy > 1e-6 {
            nodes[idx].y0 -= dy;
            nodes[idx].y1 -= dy;
        }
        y = nodes[idx].y0 - py;
    }
}
