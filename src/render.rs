use crate::config::{Config, RenderConfig};
use crate::derive::NodeLabel;
use crate::layout::link_path;
use crate::theme::Theme;
use crate::vis::Frame;
use anyhow::Result;
use std::path::Path;

const RED_GRADIENT: &str = "RED_GRADIENT";
const GREEN_RED_GRADIENT: &str = "GREEN_RED_GRADIENT";
const BOX_SHADOW: &str = "BOX_SHADOW";

pub fn render_svg(frame: &Frame, config: &Config) -> String {
    let theme = &config.theme;
    let layout_cfg = &config.layout;
    let catalog = &config.stages;
    let width = frame.width;
    let height = frame.height;
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\" font-family=\"{}\">",
        escape_xml(&theme.font_family)
    ));
    svg.push_str(
        "<style>.hover-group{opacity:0}.hide-column:hover .hover-group{opacity:1}.hide-column:hover .column-label{fill:",
    );
    svg.push_str(&theme.accent_color);
    svg.push_str("}.show-more .show-values-label{opacity:0}.show-more:hover .show-values-label{opacity:1}.show-more:hover rect.rail{fill:");
    svg.push_str(&theme.highlight_color);
    svg.push_str("}.detail-button:hover rect{opacity:0.9}.hide-column,.show-more,.detail-button{cursor:pointer}</style>");
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    push_defs(&mut svg, theme);

    for divider in &frame.guides.dividers {
        svg.push_str(&format!(
            "<rect x=\"{divider:.2}\" y=\"0\" width=\"2\" height=\"{:.2}\" fill=\"{}\"/>",
            height - layout_cfg.vertical_margin,
            theme.divider_color
        ));
    }

    svg.push_str("<g class=\"links\" fill=\"none\">");
    for (idx, link) in frame.graph.links.iter().enumerate() {
        let (Some(d), Some(geometry)) = (
            link_path(&frame.graph, &frame.layout, idx),
            frame.layout.links.get(idx),
        ) else {
            continue;
        };
        let source_name = frame.graph.nodes[link.source].name.as_str();
        let target_name = frame.graph.nodes[link.target].name.as_str();
        let stroke_width = geometry.width.max(1.0);
        let hidden = geometry.width == 0.0;
        let underlay_opacity = if hidden { 0.0 } else { 1.0 };
        let source_failed = catalog.is_failure(source_name);
        let opacity = if hidden {
            0.0
        } else if source_failed {
            1.0
        } else {
            let depth = frame.layout.nodes.get(link.source).map_or(0, |n| n.depth);
            0.05 * depth as f64 + 0.4
        };
        let stroke = if catalog.is_success(source_name) && catalog.is_failure(target_name) {
            format!("url(#{GREEN_RED_GRADIENT})")
        } else if source_failed {
            format!("url(#{RED_GRADIENT})")
        } else {
            theme.success_color.clone()
        };
        svg.push_str(&format!(
            "<g><path d=\"{d}\" stroke=\"{}\" stroke-width=\"{stroke_width:.2}\" opacity=\"{underlay_opacity}\"/><path class=\"link\" d=\"{d}\" stroke=\"{stroke}\" stroke-width=\"{:.2}\" opacity=\"{opacity:.2}\"/></g>",
            theme.link_underlay,
            stroke_width + 0.5,
        ));
    }
    svg.push_str("</g>");

    if let Some(spill) = &frame.spill {
        for rect in [spill.left(height), spill.right(height)] {
            svg.push_str(&format!(
                "<rect x=\"{:.2}\" y=\"0\" width=\"{:.2}\" height=\"{height}\" fill=\"{}\"/>",
                rect.x, rect.width, theme.background
            ));
        }
    }

    svg.push_str("<g class=\"nodes\">");
    for (node, geometry) in frame.graph.nodes.iter().zip(&frame.layout.nodes) {
        let fill = if catalog.is_failure(&node.name) {
            &theme.failure_color
        } else {
            &theme.success_color
        };
        let opacity = if geometry.value == 0.0 { 0 } else { 1 };
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"2\" fill=\"{fill}\" opacity=\"{opacity}\"/>",
            geometry.x0,
            geometry.y0 - layout_cfg.bar_extension,
            (geometry.x1 - geometry.x0).abs(),
            (geometry.y1 - geometry.y0).abs() + layout_cfg.bar_extension * 2.0,
        ));
    }
    svg.push_str("</g>");

    for (idx, column) in frame.guides.columns.iter().enumerate() {
        let hide = frame
            .hide_column
            .as_ref()
            .filter(|hide| idx == 0 && hide.dimension == column.name);
        let class = if hide.is_some() { " class=\"hide-column\"" } else { "" };
        svg.push_str(&format!("<g{class}>"));
        svg.push_str(&format!(
            "<text class=\"column-label\" x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"{}\" font-weight=\"600\" fill=\"{}\">{}</text>",
            column.label_x,
            column.label_y,
            layout_cfg.column_label_font_size,
            theme.muted_text_color,
            escape_xml(&column.label)
        ));
        if let Some(hide) = hide {
            let bounds = hide.bounds;
            let tip_x = layout_cfg.margin_left + frame.guides.column_width / 2.0 - 53.0;
            let tip_y = height / 2.0 - 13.0;
            svg.push_str(&format!(
                "<g class=\"hover-group\"><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"white\" opacity=\"0.4\"/>",
                bounds.x, bounds.y, bounds.width, bounds.height
            ));
            push_tooltip(&mut svg, theme, tip_x, tip_y, 106.0, "Hide Values");
            svg.push_str("</g>");
        }
        svg.push_str("</g>");
    }

    if let Some(rail) = frame.show_more {
        svg.push_str(&format!(
            "<g class=\"show-more\"><rect class=\"rail\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"2\" fill=\"{}\"/>",
            rail.x, rail.y, rail.width, rail.height, theme.divider_color
        ));
        svg.push_str("<g class=\"show-values-label\">");
        push_tooltip(
            &mut svg,
            theme,
            layout_cfg.node_width / 2.0,
            height / 2.0 - 13.0,
            104.0,
            "Show More",
        );
        svg.push_str("</g></g>");
    }

    svg.push_str("<g class=\"text-boxes\">");
    for label in &frame.labels {
        push_label(&mut svg, label, theme, layout_cfg.percentage_font_size);
    }
    svg.push_str("</g>");

    svg.push_str("</svg>");
    svg
}

fn push_defs(svg: &mut String, theme: &Theme) {
    svg.push_str(&format!(
        "<defs><linearGradient id=\"{RED_GRADIENT}\" gradientUnits=\"userSpaceOnUse\"><stop offset=\"0%\" stop-color=\"{}\" stop-opacity=\"1\"/><stop offset=\"100%\" stop-color=\"{}\" stop-opacity=\"1\"/></linearGradient>",
        theme.failure_gradient_start, theme.failure_gradient_end
    ));
    svg.push_str(&format!(
        "<linearGradient id=\"{GREEN_RED_GRADIENT}\" gradientUnits=\"userSpaceOnUse\"><stop offset=\"0%\" stop-color=\"{}\" stop-opacity=\"1\"/><stop offset=\"100%\" stop-color=\"{}\" stop-opacity=\"1\"/></linearGradient>",
        theme.success_color, theme.failure_color
    ));
    svg.push_str(&format!(
        "<filter id=\"{BOX_SHADOW}\"><feDropShadow dx=\"0\" dy=\"2\" stdDeviation=\"2\" flood-color=\"{}\"/></filter></defs>",
        theme.shadow_color
    ));
}

fn push_tooltip(svg: &mut String, theme: &Theme, x: f64, y: f64, width: f64, text: &str) {
    svg.push_str(&format!(
        "<g transform=\"translate({x:.2}, {y:.2})\"><rect width=\"{width}\" height=\"26\" rx=\"5\" fill=\"{}\"/><text x=\"32\" y=\"17\" font-size=\"12\" fill=\"{}\">{}</text></g>",
        theme.tooltip_fill,
        theme.tooltip_text_color,
        escape_xml(text)
    ));
}

fn push_label(svg: &mut String, label: &NodeLabel, theme: &Theme, percentage_font_size: f64) {
    let opacity = if label.visible { 1 } else { 0 };
    let text_color = if label.selected {
        &theme.selected_text_color
    } else {
        &theme.box_text_color
    };
    svg.push_str(&format!("<g class=\"text-box\" opacity=\"{opacity}\">"));

    let bounds = label.box_bounds;
    let (box_fill, box_opacity) = if label.outcome {
        ("transparent", 0.8)
    } else if label.selected {
        (theme.selected_fill.as_str(), 1.0)
    } else {
        (theme.box_fill.as_str(), 0.8)
    };
    let filter = if label.outcome {
        String::new()
    } else {
        format!(" filter=\"url(#{BOX_SHADOW})\"")
    };
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{}\" rx=\"3\" fill=\"{box_fill}\" opacity=\"{box_opacity}\"{filter}/>",
        bounds.x, bounds.y, bounds.width, bounds.height
    ));
    svg.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{}\" font-weight=\"400\" fill=\"{text_color}\">{}</text>",
        label.text_x,
        label.name_y,
        label.font_size,
        escape_xml(&label.name)
    ));
    svg.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{}\" font-weight=\"600\" fill=\"{text_color}\">{}</text>",
        label.text_x,
        label.value_y,
        label.font_size,
        escape_xml(&label.value_text)
    ));

    if let Some(button) = &label.detail_button {
        svg.push_str(&format!(
            "<g class=\"detail-button\" data-stage=\"{}\"><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{}\" rx=\"3\" fill=\"{}\"/><text x=\"{:.2}\" y=\"{:.2}\" font-size=\"10\" text-anchor=\"middle\" fill=\"{}\">{}</text></g>",
            escape_xml(&button.stage),
            button.bounds.x,
            button.bounds.y,
            button.bounds.width,
            button.bounds.height,
            theme.accent_color,
            button.text_x,
            button.text_y,
            theme.selected_text_color,
            button.caption()
        ));
    }

    let percentage_color = if label.outcome {
        if label.success {
            &theme.success_color
        } else {
            &theme.failure_color
        }
    } else if label.selected {
        &theme.selected_text_color
    } else {
        &theme.muted_text_color
    };
    svg.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" font-size=\"{percentage_font_size}\" font-weight=\"600\" fill=\"{percentage_color}\">{}</text>",
        label.percentage_x,
        label.value_y,
        escape_xml(&label.percentage)
    ));
    svg.push_str("</g>");
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Open Sans".to_string();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("invalid canvas size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> Result<()> {
    anyhow::bail!("PNG output requires the `png` feature")
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
