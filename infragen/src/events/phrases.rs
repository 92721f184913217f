//! Human-readable phrasing for well-known stage names.

use crate::stages::{
    BUILD_MODEL, EXTRACT_ENTITIES, GENERATE_CROSSPLANE, GENERATE_TERRAFORM, WRITE_OUTPUT,
};

/// Phrase shown when a stage starts.
#[must_use]
pub fn start_phrase(stage: &str) -> String {
    match stage {
        EXTRACT_ENTITIES => "Extracting infrastructure entities".to_string(),
        BUILD_MODEL => "Building resource model".to_string(),
        GENERATE_TERRAFORM => "Generating Terraform configuration".to_string(),
        GENERATE_CROSSPLANE => "Generating Crossplane manifests".to_string(),
        WRITE_OUTPUT => "Writing output files".to_string(),
        other => format!("Starting {other}"),
    }
}

/// Phrase shown when a stage completes.
#[must_use]
pub fn complete_phrase(stage: &str) -> String {
    match stage {
        EXTRACT_ENTITIES => "Extracted infrastructure entities".to_string(),
        BUILD_MODEL => "Built resource model".to_string(),
        GENERATE_TERRAFORM => "Generated Terraform configuration".to_string(),
        GENERATE_CROSSPLANE => "Generated Crossplane manifests".to_string(),
        WRITE_OUTPUT => "Wrote output files".to_string(),
        other => format!("Completed {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_stage_phrases() {
        assert_eq!(start_phrase(BUILD_MODEL), "Building resource model");
        assert_eq!(complete_phrase(WRITE_OUTPUT), "Wrote output files");
    }

    #[test]
    fn test_unknown_stage_falls_back() {
        assert_eq!(start_phrase("A"), "Starting A");
        assert_eq!(complete_phrase("A"), "Completed A");
    }
}
