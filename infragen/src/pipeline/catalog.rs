//! Stage catalog and wiring checks.

use crate::core::ValueKind;
use crate::errors::ConfigurationError;
use crate::stages::{
    CrossplaneGenerationStage, EntityExtractionStage, ModelBuildingStage, OutputWriterStage, Stage,
    TerraformGenerationStage,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A manifest format the generators can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Terraform HCL.
    Terraform,
    /// Crossplane managed-resource YAML.
    Crossplane,
}

impl OutputFormat {
    /// All known formats.
    pub const ALL: [Self; 2] = [Self::Terraform, Self::Crossplane];

    /// Parses a format name, case-insensitively, accepting short aliases.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "terraform" | "tf" | "hcl" => Some(Self::Terraform),
            "crossplane" | "xp" => Some(Self::Crossplane),
            _ => None,
        }
    }

    /// Returns the canonical name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Terraform => "terraform",
            Self::Crossplane => "crossplane",
        }
    }

    /// Returns the name shown to users.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Terraform => "Terraform",
            Self::Crossplane => "Crossplane",
        }
    }

    /// Returns the manifest file name used when none is configured.
    #[must_use]
    pub fn default_file_name(self) -> &'static str {
        match self {
            Self::Terraform => "main.tf",
            Self::Crossplane => "composition.yaml",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A stage together with the value kinds it consumes and produces.
#[derive(Debug, Clone)]
pub struct WiredStage {
    /// The stage.
    pub stage: Arc<dyn Stage>,
    /// What the stage accepts.
    pub accepts: ValueKind,
    /// What the stage produces.
    pub produces: ValueKind,
}

impl WiredStage {
    /// Pairs a stage with its value kinds.
    #[must_use]
    pub fn new(stage: Arc<dyn Stage>, accepts: ValueKind, produces: ValueKind) -> Self {
        Self {
            stage,
            accepts,
            produces,
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.stage.name()
    }
}

/// Source of the stages a coordinator wires into a run.
pub trait StageCatalog: Send + Sync {
    /// Formats this catalog can generate.
    fn formats(&self) -> Vec<OutputFormat>;

    /// Stage turning description text into entities.
    fn extractor(&self) -> WiredStage;

    /// Stage turning entities into a resource model.
    fn model_builder(&self, region: &str) -> WiredStage;

    /// Stage rendering a model as `format`, if supported.
    fn generator(&self, format: OutputFormat, use_templates: bool) -> Option<WiredStage>;

    /// Stage writing the rendered manifest to `path`.
    fn writer(&self, path: &Path) -> WiredStage;
}

/// The stages shipped with this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl StageCatalog for BuiltinCatalog {
    fn formats(&self) -> Vec<OutputFormat> {
        OutputFormat::ALL.to_vec()
    }

    fn extractor(&self) -> WiredStage {
        WiredStage::new(
            Arc::new(EntityExtractionStage::new()),
            ValueKind::Text,
            ValueKind::Entities,
        )
    }

    fn model_builder(&self, region: &str) -> WiredStage {
        WiredStage::new(
            Arc::new(ModelBuildingStage::new(region)),
            ValueKind::Entities,
            ValueKind::Model,
        )
    }

    fn generator(&self, format: OutputFormat, use_templates: bool) -> Option<WiredStage> {
        let stage: Arc<dyn Stage> = match format {
            OutputFormat::Terraform => Arc::new(TerraformGenerationStage::new(use_templates)),
            OutputFormat::Crossplane => Arc::new(CrossplaneGenerationStage::new(use_templates)),
        };
        Some(WiredStage::new(stage, ValueKind::Model, ValueKind::Text))
    }

    fn writer(&self, path: &Path) -> WiredStage {
        WiredStage::new(
            Arc::new(OutputWriterStage::new(path)),
            ValueKind::Text,
            ValueKind::Path,
        )
    }
}

/// Checks that each stage accepts what the one before it produces.
///
/// # Errors
///
/// [`ConfigurationError::EmptyPipeline`] for an empty chain and
/// [`ConfigurationError::StageMismatch`] for the first incompatible pair.
pub fn check_chain(stages: &[WiredStage], initial: ValueKind) -> Result<(), ConfigurationError> {
    if stages.is_empty() {
        return Err(ConfigurationError::EmptyPipeline);
    }

    let mut upstream = "input".to_string();
    let mut produced = initial;
    for wired in stages {
        if wired.accepts != produced {
            return Err(ConfigurationError::StageMismatch {
                upstream,
                downstream: wired.name().to_string(),
                produced,
                expected: wired.accepts,
            });
        }
        upstream = wired.name().to_string();
        produced = wired.produces;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{BUILD_MODEL, EXTRACT_ENTITIES, WRITE_OUTPUT};

    #[test]
    fn test_format_names() {
        assert_eq!(OutputFormat::from_name("Terraform"), Some(OutputFormat::Terraform));
        assert_eq!(OutputFormat::from_name("tf"), Some(OutputFormat::Terraform));
        assert_eq!(OutputFormat::from_name(" xp "), Some(OutputFormat::Crossplane));
        assert_eq!(OutputFormat::from_name("pulumi"), None);
        assert_eq!(OutputFormat::Crossplane.default_file_name(), "composition.yaml");
        assert_eq!(OutputFormat::Terraform.to_string(), "terraform");
    }

    #[test]
    fn test_builtin_chain_is_compatible() {
        let catalog = BuiltinCatalog;
        for format in catalog.formats() {
            let stages = vec![
                catalog.extractor(),
                catalog.model_builder("us-east-1"),
                catalog.generator(format, true).unwrap(),
                catalog.writer(Path::new("/tmp/out/main.tf")),
            ];
            check_chain(&stages, ValueKind::Text).unwrap();
        }
    }

    #[test]
    fn test_mismatch_names_both_stages() {
        let catalog = BuiltinCatalog;
        let stages = vec![catalog.extractor(), catalog.writer(Path::new("out.tf"))];

        let err = check_chain(&stages, ValueKind::Text).unwrap_err();
        match err {
            ConfigurationError::StageMismatch {
                upstream,
                downstream,
                produced,
                expected,
            } => {
                assert_eq!(upstream, EXTRACT_ENTITIES);
                assert_eq!(downstream, WRITE_OUTPUT);
                assert_eq!(produced, ValueKind::Entities);
                assert_eq!(expected, ValueKind::Text);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_first_stage_must_accept_initial() {
        let stages = vec![BuiltinCatalog.model_builder("us-east-1")];
        let err = check_chain(&stages, ValueKind::Text).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("stage {BUILD_MODEL} expects entities but input produces text")
        );
    }

    #[test]
    fn test_empty_chain() {
        assert!(matches!(
            check_chain(&[], ValueKind::Text),
            Err(ConfigurationError::EmptyPipeline)
        ));
    }
}
