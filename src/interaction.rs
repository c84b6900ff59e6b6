//! Hidden-dimension stack and detail-stage toggle.
//!
//! Every transition here produces a *request*: a [`ConfigPatch`] the host may
//! apply before re-rendering, plus an optional outgoing panel message. Nothing
//! in this module mutates the configuration the component was rendered with.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::host::VisMessage;
use crate::ir::FieldDescriptor;
use crate::stages::StageCatalog;

/// Host-owned configuration as read by the component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisConfig {
    pub hidden_dimensions: Vec<String>,
    pub selected_detail_stage: String,
}

impl VisConfig {
    /// Host-side application of a patch. Each present field replaces the
    /// current value wholesale.
    pub fn apply(&mut self, patch: &ConfigPatch) {
        if let Some(hidden) = &patch.hidden_dimensions {
            self.hidden_dimensions = hidden.clone();
        }
        if let Some(stage) = &patch.selected_detail_stage {
            self.selected_detail_stage = stage.clone();
        }
    }

    pub fn patched(&self, patch: &ConfigPatch) -> Self {
        let mut next = self.clone();
        next.apply(patch);
        next
    }
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("invalid config patch: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("config patch has no recognized fields")]
    Empty,
}

/// Typed partial update over [`VisConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_dimensions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_detail_stage: Option<String>,
}

impl ConfigPatch {
    pub fn hidden_dimensions(hidden: Vec<String>) -> Self {
        Self {
            hidden_dimensions: Some(hidden),
            selected_detail_stage: None,
        }
    }

    pub fn selected_detail_stage(stage: &str) -> Self {
        Self {
            hidden_dimensions: None,
            selected_detail_stage: Some(stage.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hidden_dimensions.is_none() && self.selected_detail_stage.is_none()
    }

    pub fn parse(json: &str) -> Result<Self, PatchError> {
        let patch: Self = serde_json::from_str(json)?;
        if patch.is_empty() {
            return Err(PatchError::Empty);
        }
        Ok(patch)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// User gestures the rendered chart accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Gesture {
    HideColumn,
    ShowMore,
    ToggleDetail { stage: String },
}

/// Labelled stage columns: the visible dimensions minus the terminal one.
pub fn columns<'a>(visible: &[&'a FieldDescriptor]) -> Vec<&'a FieldDescriptor> {
    match visible.split_last() {
        Some((_, rest)) => rest.to_vec(),
        None => Vec::new(),
    }
}

/// The hide control sits on the first column, and only while more than two
/// columns remain.
pub fn hide_affordance<'a>(columns: &[&'a FieldDescriptor]) -> Option<&'a FieldDescriptor> {
    if columns.len() > 2 {
        columns.first().copied()
    } else {
        None
    }
}

pub fn show_more_available(config: &VisConfig) -> bool {
    !config.hidden_dimensions.is_empty()
}

/// Push `dimension` onto the hidden stack.
pub fn hide_dimension(config: &VisConfig, dimension: &str) -> ConfigPatch {
    let mut hidden = config.hidden_dimensions.clone();
    hidden.push(dimension.to_string());
    ConfigPatch::hidden_dimensions(hidden)
}

/// Pop the most recently hidden dimension.
pub fn show_more(config: &VisConfig) -> Option<ConfigPatch> {
    let (_, rest) = config.hidden_dimensions.split_last()?;
    Some(ConfigPatch::hidden_dimensions(rest.to_vec()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailToggle {
    pub patch: ConfigPatch,
    pub message: VisMessage,
}

/// Selecting the already-selected stage clears it and hides the detail
/// panel; any other eligible stage replaces the selection.
pub fn toggle_detail(
    config: &VisConfig,
    stage: &str,
    catalog: &StageCatalog,
) -> Option<DetailToggle> {
    if !catalog.is_eligible_detail_stage(stage) {
        return None;
    }
    if config.selected_detail_stage == stage {
        return Some(DetailToggle {
            patch: ConfigPatch::selected_detail_stage(""),
            message: VisMessage::HideDetailPanel,
        });
    }
    Some(DetailToggle {
        patch: ConfigPatch::selected_detail_stage(stage),
        message: VisMessage::SetStage(stage.to_string()),
    })
}

/// Request issued when the host broadcasts a clear-selection message.
pub fn clear_selection() -> ConfigPatch {
    ConfigPatch::selected_detail_stage("")
}
