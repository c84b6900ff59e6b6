use crate::layout::LayeredFlowLayout;
use crate::stages::StageCatalog;
use crate::text_metrics::{FallbackMetrics, FontMetrics, TextMeasure};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub margin_left: f64,
    pub margin_right: f64,
    pub vertical_margin: f64,
    pub node_width: f64,
    pub node_padding: f64,
    pub relax_iterations: usize,
    pub bar_extension: f64,
    pub label_padding: f64,
    pub detail_offset: f64,
    pub label_line_height: f64,
    pub label_font_size: f64,
    pub outcome_font_size: f64,
    pub percentage_font_size: f64,
    pub column_label_font_size: f64,
    pub fast_text_metrics: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin_left: 28.0,
            margin_right: 150.0,
            vertical_margin: 20.0,
            node_width: 12.0,
            node_padding: 42.0,
            relax_iterations: 6,
            bar_extension: 8.0,
            label_padding: 8.0,
            detail_offset: 32.0,
            label_line_height: 8.0 / 6.0,
            label_font_size: 12.0,
            outcome_font_size: 20.0,
            percentage_font_size: 12.0,
            column_label_font_size: 11.0,
            fast_text_metrics: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 540.0,
        }
    }
}

/// Presentation settings of the renderer. Distinct from the host-owned
/// `VisConfig`, which the component only reads.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub stages: StageCatalog,
}

impl Config {
    pub fn layout_engine(&self) -> LayeredFlowLayout {
        LayeredFlowLayout {
            node_width: self.layout.node_width,
            node_padding: self.layout.node_padding,
            iterations: self.layout.relax_iterations,
        }
    }

    pub fn text_measure(&self) -> Box<dyn TextMeasure> {
        if self.layout.fast_text_metrics {
            Box::new(FallbackMetrics)
        } else {
            Box::new(FontMetrics::new(&self.theme.font_family))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    background: Option<String>,
    success_color: Option<String>,
    failure_color: Option<String>,
    accent_color: Option<String>,
    divider_color: Option<String>,
    muted_text_color: Option<String>,
    box_fill: Option<String>,
    box_text_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    margin_left: Option<f64>,
    margin_right: Option<f64>,
    vertical_margin: Option<f64>,
    node_width: Option<f64>,
    node_padding: Option<f64>,
    relax_iterations: Option<usize>,
    label_font_size: Option<f64>,
    outcome_font_size: Option<f64>,
    fast_text_metrics: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    width: Option<f32>,
    height: Option<f32>,
    stages: Option<StageCatalog>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a config file body. Strict JSON first, then JSON5 for hand-written
/// files with comments or trailing commas.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents)
            .map_err(|json5_err| anyhow::anyhow!("invalid config: {json_err}; {json5_err}"))?,
    };

    let mut config = Config::default();
    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "dark" => config.theme = Theme::dark(),
            "dashboard" | "default" => config.theme = Theme::dashboard(),
            other => anyhow::bail!("unknown theme {other:?}"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.success_color {
            config.theme.success_color = v;
        }
        if let Some(v) = vars.failure_color {
            config.theme.failure_gradient_end = v.clone();
            config.theme.failure_color = v;
        }
        if let Some(v) = vars.accent_color {
            config.theme.accent_color = v;
        }
        if let Some(v) = vars.divider_color {
            config.theme.divider_color = v;
        }
        if let Some(v) = vars.muted_text_color {
            config.theme.muted_text_color = v;
        }
        if let Some(v) = vars.box_fill {
            config.theme.box_fill = v;
        }
        if let Some(v) = vars.box_text_color {
            config.theme.box_text_color = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.margin_left {
            config.layout.margin_left = v;
        }
        if let Some(v) = layout.margin_right {
            config.layout.margin_right = v;
        }
        if let Some(v) = layout.vertical_margin {
            config.layout.vertical_margin = v;
        }
        if let Some(v) = layout.node_width {
            config.layout.node_width = v;
        }
        if let Some(v) = layout.node_padding {
            config.layout.node_padding = v;
        }
        if let Some(v) = layout.relax_iterations {
            config.layout.relax_iterations = v;
        }
        if let Some(v) = layout.label_font_size {
            config.layout.label_font_size = v;
            config.layout.percentage_font_size = v;
        }
        if let Some(v) = layout.outcome_font_size {
            config.layout.outcome_font_size = v;
        }
        if let Some(v) = layout.fast_text_metrics {
            config.layout.fast_text_metrics = v;
        }
    }

    if let Some(v) = parsed.width {
        config.render.width = v;
    }
    if let Some(v) = parsed.height {
        config.render.height = v;
    }
    if let Some(stages) = parsed.stages {
        stages.validate()?;
        config.stages = stages;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_keeps_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.layout.margin_right, 150.0);
        assert_eq!(config.stages, StageCatalog::default());
    }

    #[test]
    fn json5_fallback_accepts_comments() {
        let config = parse_config(
            r#"{
                // narrower right gutter
                layout: { marginRight: 90, fastTextMetrics: true },
                theme: "dark",
            }"#,
        )
        .unwrap();
        assert_eq!(config.layout.margin_right, 90.0);
        assert!(config.layout.fast_text_metrics);
        assert_eq!(config.theme.background, Theme::dark().background);
    }

    #[test]
    fn stage_overrides_are_validated() {
        let err = parse_config(
            r#"{"stages": {"stages": [], "finalOutcomes": ["Done"], "detailStages": []}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("exactly two detail stages"));
    }

    #[test]
    fn unknown_theme_is_an_error() {
        assert!(parse_config(r#"{"theme": "neon"}"#).is_err());
    }
}
