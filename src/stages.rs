use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Success and failure labels a pipeline stage writes into its dimension column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescription {
    pub id: String,
    pub success: String,
    pub failure: String,
}

impl StageDescription {
    pub fn new(id: &str, success: &str, failure: &str) -> Self {
        Self {
            id: id.to_string(),
            success: success.to_string(),
            failure: failure.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("expected exactly two detail stages, found {0}")]
    DetailStageCount(usize),
    #[error("detail stage {0:?} is not a known stage id")]
    UnknownDetailStage(String),
    #[error("final outcome list is empty")]
    NoFinalOutcomes,
}

/// Classification of category text: which values are successes, failures and
/// terminal outcomes, and which stages carry a "show details" control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCatalog {
    pub stages: Vec<StageDescription>,
    pub final_outcomes: Vec<String>,
    pub detail_stages: Vec<String>,
}

pub const ELIGIBILITY: &str = "ELIGIBILITY";
pub const TARGET_MATCH: &str = "TARGET_MATCH";
pub const POST_PROCESSING: &str = "POST_PROCESSING";
pub const BID: &str = "BID";

static DEFAULT_CATALOG: Lazy<StageCatalog> = Lazy::new(|| {
    let stages = vec![
        StageDescription::new(ELIGIBILITY, "Eligible", "Ineligible"),
        StageDescription::new(TARGET_MATCH, "Targeting Matched", "Targeting Unmatched"),
        StageDescription::new(
            POST_PROCESSING,
            "Post-Processing Passed",
            "Post-Processing Dropped",
        ),
        StageDescription::new(BID, "Bid OK", "No Bid"),
    ];
    StageCatalog {
        final_outcomes: vec!["Bid OK".to_string(), "No Bid".to_string()],
        detail_stages: vec![TARGET_MATCH.to_string(), POST_PROCESSING.to_string()],
        stages,
    }
});

impl Default for StageCatalog {
    fn default() -> Self {
        DEFAULT_CATALOG.clone()
    }
}

impl StageCatalog {
    pub fn new(
        stages: Vec<StageDescription>,
        final_outcomes: Vec<String>,
        detail_stages: Vec<String>,
    ) -> Result<Self, CatalogError> {
        let catalog = Self {
            stages,
            final_outcomes,
            detail_stages,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.detail_stages.len() != 2 {
            return Err(CatalogError::DetailStageCount(self.detail_stages.len()));
        }
        for id in &self.detail_stages {
            if self.stage(id).is_none() {
                return Err(CatalogError::UnknownDetailStage(id.clone()));
            }
        }
        if self.final_outcomes.is_empty() {
            return Err(CatalogError::NoFinalOutcomes);
        }
        Ok(())
    }

    pub fn stage(&self, id: &str) -> Option<&StageDescription> {
        self.stages.iter().find(|stage| stage.id == id)
    }

    pub fn is_success(&self, text: &str) -> bool {
        self.stages.iter().any(|stage| stage.success == text)
    }

    pub fn is_failure(&self, text: &str) -> bool {
        self.stages.iter().any(|stage| stage.failure == text)
    }

    /// Terminal outcomes keep their raw text as node identity.
    pub fn is_outcome(&self, text: &str) -> bool {
        self.final_outcomes.iter().any(|outcome| outcome == text)
    }

    pub fn is_eligible_detail_stage(&self, id: &str) -> bool {
        self.detail_stages.iter().any(|stage| stage == id)
    }

    /// Detail stage whose failure label is `name`, if that stage is eligible.
    pub fn detail_stage_for(&self, name: &str) -> Option<&str> {
        self.detail_stages
            .iter()
            .filter_map(|id| self.stage(id))
            .find(|stage| stage.failure == name)
            .map(|stage| stage.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_valid() {
        let catalog = StageCatalog::default();
        assert_eq!(catalog.validate(), Ok(()));
        assert!(catalog.is_outcome("Bid OK"));
        assert!(catalog.is_success("Bid OK"));
        assert!(catalog.is_failure("Targeting Unmatched"));
        assert!(!catalog.is_outcome("Eligible"));
    }

    #[test]
    fn detail_stage_maps_from_failure_label_only() {
        let catalog = StageCatalog::default();
        assert_eq!(
            catalog.detail_stage_for("Post-Processing Dropped"),
            Some(POST_PROCESSING)
        );
        assert_eq!(catalog.detail_stage_for("Post-Processing Passed"), None);
        assert_eq!(catalog.detail_stage_for("Ineligible"), None);
    }

    #[test]
    fn rejects_wrong_detail_stage_count() {
        let err = StageCatalog::new(
            vec![StageDescription::new("A", "ok", "bad")],
            vec!["ok".to_string()],
            vec!["A".to_string()],
        )
        .unwrap_err();
        assert_eq!(err, CatalogError::DetailStageCount(1));
    }

    #[test]
    fn rejects_unknown_detail_stage() {
        let err = StageCatalog::new(
            vec![StageDescription::new("A", "ok", "bad")],
            vec!["ok".to_string()],
            vec!["A".to_string(), "B".to_string()],
        )
        .unwrap_err();
        assert_eq!(err, CatalogError::UnknownDetailStage("B".to_string()));
    }
}
