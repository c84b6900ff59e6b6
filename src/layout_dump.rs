use crate::layout::link_path;
use crate::vis::{Affordance, Frame};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f64,
    pub height: f64,
    pub hidden_dimensions: Vec<String>,
    pub selected_detail_stage: String,
    pub columns: Vec<String>,
    pub nodes: Vec<NodeDump>,
    pub links: Vec<LinkDump>,
    pub affordances: Vec<Affordance>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub name: String,
    pub depth: usize,
    pub value: f64,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    pub percentage: String,
}

#[derive(Debug, Serialize)]
pub struct LinkDump {
    pub source: String,
    pub target: String,
    pub value: f64,
    pub width: f64,
    pub y0: f64,
    pub y1: f64,
    pub path: Option<String>,
}

impl LayoutDump {
    pub fn from_frame(frame: &Frame) -> Self {
        let nodes = frame
            .graph
            .nodes
            .iter()
            .zip(&frame.layout.nodes)
            .enumerate()
            .map(|(idx, (node, geometry))| NodeDump {
                id: node.id.clone(),
                name: node.name.clone(),
                depth: geometry.depth,
                value: geometry.value,
                x0: geometry.x0,
                x1: geometry.x1,
                y0: geometry.y0,
                y1: geometry.y1,
                percentage: frame
                    .labels
                    .iter()
                    .find(|label| label.node == idx)
                    .map(|label| label.percentage.clone())
                    .unwrap_or_default(),
            })
            .collect();

        let links = frame
            .graph
            .links
            .iter()
            .zip(&frame.layout.links)
            .enumerate()
            .map(|(idx, (link, geometry))| LinkDump {
                source: frame.graph.nodes[link.source].id.clone(),
                target: frame.graph.nodes[link.target].id.clone(),
                value: link.value,
                width: geometry.width,
                y0: geometry.y0,
                y1: geometry.y1,
                path: link_path(&frame.graph, &frame.layout, idx),
            })
            .collect();

        LayoutDump {
            width: frame.width,
            height: frame.height,
            hidden_dimensions: frame.config.hidden_dimensions.clone(),
            selected_detail_stage: frame.config.selected_detail_stage.clone(),
            columns: frame
                .guides
                .columns
                .iter()
                .map(|column| column.name.clone())
                .collect(),
            nodes,
            links,
            affordances: frame.affordances.clone(),
        }
    }
}

pub fn write_layout_dump(path: &Path, frame: &Frame) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_frame(frame);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
