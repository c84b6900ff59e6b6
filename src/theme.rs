use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub background: String,
    pub success_color: String,
    pub failure_color: String,
    pub failure_gradient_start: String,
    pub failure_gradient_end: String,
    pub accent_color: String,
    pub highlight_color: String,
    pub divider_color: String,
    pub muted_text_color: String,
    pub box_fill: String,
    pub box_text_color: String,
    pub selected_fill: String,
    pub selected_text_color: String,
    pub tooltip_fill: String,
    pub tooltip_text_color: String,
    pub link_underlay: String,
    pub shadow_color: String,
}

impl Theme {
    /// Palette of the hosting dashboard.
    pub fn dashboard() -> Self {
        Self {
            font_family: "Open Sans, sans-serif".to_string(),
            background: "#F1F3F2".to_string(),
            success_color: "#3DBE8B".to_string(),
            failure_color: "#E25454".to_string(),
            failure_gradient_start: "#EB8F8F".to_string(),
            failure_gradient_end: "#E25454".to_string(),
            accent_color: "#2F80ED".to_string(),
            highlight_color: "#D6E6FB".to_string(),
            divider_color: "#E0E3E2".to_string(),
            muted_text_color: "#6E7776".to_string(),
            box_fill: "#FFFFFF".to_string(),
            box_text_color: "#1F2A2E".to_string(),
            selected_fill: "#6E7776".to_string(),
            selected_text_color: "#FFFFFF".to_string(),
            tooltip_fill: "#1F2A2E".to_string(),
            tooltip_text_color: "#FFFFFF".to_string(),
            link_underlay: "#FFFFFF".to_string(),
            shadow_color: "rgba(0,0,0,0.16)".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: "#16202A".to_string(),
            divider_color: "#2A3642".to_string(),
            muted_text_color: "#9AA5B1".to_string(),
            box_fill: "#22303C".to_string(),
            box_text_color: "#E6EDF3".to_string(),
            selected_fill: "#9AA5B1".to_string(),
            selected_text_color: "#16202A".to_string(),
            tooltip_fill: "#E6EDF3".to_string(),
            tooltip_text_color: "#16202A".to_string(),
            link_underlay: "#16202A".to_string(),
            ..Self::dashboard()
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dashboard()
    }
}
