//! Visual quantities derived from a laid-out graph: cohort percentages, label
//! boxes, column guides and the spill covers.

use serde::Serialize;

use crate::config::LayoutConfig;
use crate::ir::{FieldDescriptor, Graph};
use crate::layout::FlowLayout;
use crate::stages::StageCatalog;
use crate::text_metrics::TextMeasure;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// Share of a node within its depth cohort, e.g. `30%`, `~33%` or `<1%`.
///
/// The opposing node is the first node at the same depth with a different
/// name; cohorts larger than two are not supported.
pub fn cohort_percentage(node_idx: usize, graph: &Graph, layout: &FlowLayout) -> String {
    let (Some(node), Some(name)) = (
        layout.nodes.get(node_idx),
        graph.nodes.get(node_idx).map(|node| node.name.as_str()),
    ) else {
        return String::new();
    };
    let opposing = layout
        .nodes
        .iter()
        .zip(&graph.nodes)
        .find(|(other, other_node)| other.depth == node.depth && other_node.name != name)
        .map(|(other, _)| other.value)
        .unwrap_or(0.0);
    format_percentage(node.value, opposing)
}

pub fn format_percentage(value: f64, opposing: f64) -> String {
    let total = value + opposing;
    let percentage = if total > 0.0 {
        100.0 * value / total
    } else {
        0.0
    };
    let rounded = (percentage + 0.5).floor();
    if rounded == 0.0 {
        return "<1%".to_string();
    }
    let prefix = if rounded != percentage { "~" } else { "" };
    format!("{prefix}{rounded}%")
}

/// Opaque bands covering link curves that overshoot the chart's extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpillCovers {
    pub left_width: f64,
    pub right_x0: f64,
    pub right_width: f64,
}

impl SpillCovers {
    pub fn left(&self, height: f64) -> Rect {
        Rect::new(0.0, 0.0, self.left_width.max(0.0), height)
    }

    pub fn right(&self, height: f64) -> Rect {
        Rect::new(self.right_x0, 0.0, self.right_width.max(0.0), height)
    }
}

/// Recomputed after every layout; `None` when nothing links.
pub fn spill_cover_bounds(
    graph: &Graph,
    layout: &FlowLayout,
    canvas_width: f64,
) -> Option<SpillCovers> {
    let mut left = f64::INFINITY;
    let mut right = f64::NEG_INFINITY;
    for link in &graph.links {
        let (Some(source), Some(target)) =
            (layout.nodes.get(link.source), layout.nodes.get(link.target))
        else {
            continue;
        };
        left = left.min(source.x0);
        right = right.max(target.x1);
    }
    if !left.is_finite() || !right.is_finite() {
        return None;
    }
    Some(SpillCovers {
        left_width: left,
        right_x0: right,
        right_width: canvas_width - right,
    })
}

/// Short form used on value labels: `950`, `1.2K`, `3.4M`, `5.6B`.
pub fn abbreviate_number(value: f64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];
    let magnitude = value.abs();
    for (scale, suffix) in UNITS {
        if magnitude >= scale {
            return format!("{}{suffix}", trim_decimal(value / scale));
        }
    }
    trim_decimal(value)
}

fn trim_decimal(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.1}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnGuide {
    pub name: String,
    pub label: String,
    pub label_x: f64,
    pub label_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnGuides {
    pub column_width: f64,
    pub dividers: Vec<f64>,
    pub columns: Vec<ColumnGuide>,
}

/// Divider positions (one per column plus the closing one) and label anchors.
pub fn column_guides(
    columns: &[&FieldDescriptor],
    canvas_width: f64,
    canvas_height: f64,
    config: &LayoutConfig,
) -> ColumnGuides {
    if columns.is_empty() {
        return ColumnGuides {
            column_width: 0.0,
            dividers: Vec::new(),
            columns: Vec::new(),
        };
    }
    let column_width =
        (canvas_width - config.margin_right - config.margin_left) / columns.len() as f64;
    let dividers = (0..=columns.len())
        .map(|idx| {
            config.margin_left + (column_width - 1.8) * idx as f64 + config.node_width / 2.0 - 1.0
        })
        .collect();
    let columns = columns
        .iter()
        .enumerate()
        .map(|(idx, column)| ColumnGuide {
            name: column.name.clone(),
            label: column.display_label().to_uppercase(),
            label_x: config.margin_left + column_width * idx as f64 + column_width / 2.0,
            label_y: canvas_height - 3.0,
        })
        .collect();
    ColumnGuides {
        column_width,
        dividers,
        columns,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailButton {
    pub stage: String,
    pub selected: bool,
    pub bounds: Rect,
    pub text_x: f64,
    pub text_y: f64,
}

impl DetailButton {
    pub fn caption(&self) -> &'static str {
        if self.selected {
            "Hide Details"
        } else {
            "Show Details"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeLabel {
    pub node: usize,
    pub name: String,
    pub value_text: String,
    pub percentage: String,
    pub visible: bool,
    pub outcome: bool,
    pub success: bool,
    pub selected: bool,
    pub font_size: f64,
    pub name_width: f64,
    pub text_x: f64,
    pub name_y: f64,
    pub value_y: f64,
    pub percentage_x: f64,
    pub box_bounds: Rect,
    pub detail_button: Option<DetailButton>,
}

/// Two passes: first measure every name label, then place the dependent
/// boxes, buttons and percentage labels from those widths.
pub fn place_labels(
    graph: &Graph,
    layout: &FlowLayout,
    selected_stage: &str,
    canvas_width: f64,
    catalog: &StageCatalog,
    config: &LayoutConfig,
    measure: &dyn TextMeasure,
) -> Vec<NodeLabel> {
    let font_sizes: Vec<f64> = graph
        .nodes
        .iter()
        .map(|node| {
            if catalog.is_outcome(&node.name) {
                config.outcome_font_size
            } else {
                config.label_font_size
            }
        })
        .collect();
    let name_widths: Vec<f64> = graph
        .nodes
        .iter()
        .zip(&font_sizes)
        .map(|(node, &size)| measure.text_width(&node.name, size))
        .collect();

    let padding = config.label_padding;
    graph
        .nodes
        .iter()
        .enumerate()
        .filter_map(|(idx, node)| {
            let geometry = layout.nodes.get(idx)?;
            let outcome = catalog.is_outcome(&node.name);
            let detail_stage = catalog.detail_stage_for(&node.name);
            let selected = detail_stage.is_some_and(|stage| stage == selected_stage);
            let offset = if detail_stage.is_some() {
                config.detail_offset
            } else {
                0.0
            };
            let margin = if outcome { 5.0 } else { -5.0 };
            let font_size = font_sizes[idx];
            let name_width = name_widths[idx];
            let v_center = geometry.center_y();
            let box_x = geometry.x1 + margin;
            let text_x = box_x + padding;
            let name_y = (v_center - offset).max(30.0);
            let value_y =
                (v_center + font_size * config.label_line_height - offset).max(46.0);
            let box_height = if detail_stage.is_some() { 72.0 } else { 40.0 };
            let box_bounds = Rect::new(
                box_x,
                (v_center - padding * 2.0 - offset).max(14.0),
                name_width + padding * 2.0 + 3.0,
                box_height,
            );
            let percentage_x = if outcome {
                canvas_width
            } else {
                name_width + padding + geometry.x1 + margin
            };
            let detail_button = detail_stage.map(|stage| {
                let label_width = name_width + padding * 2.0;
                DetailButton {
                    stage: stage.to_string(),
                    selected,
                    bounds: Rect::new(
                        box_x + 5.0,
                        (v_center - padding * 2.0 + 13.0).max(13.0 + 46.0),
                        label_width - padding,
                        20.0,
                    ),
                    text_x: geometry.x1 + label_width / 2.0 - padding / 2.0,
                    text_y: (v_center - padding * 2.0 + 26.5).max(26.5 + 45.0),
                }
            });
            Some(NodeLabel {
                node: idx,
                name: node.name.clone(),
                value_text: abbreviate_number(geometry.value),
                percentage: cohort_percentage(idx, graph, layout),
                visible: geometry.value != 0.0,
                outcome,
                success: catalog.is_success(&node.name),
                selected,
                font_size,
                name_width,
                text_x,
                name_y,
                value_y,
                percentage_x,
                box_bounds,
                detail_button,
            })
        })
        .collect()
}
