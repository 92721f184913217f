//! Terraform (HCL) generation.

use super::Stage;
use crate::cancellation::RunContext;
use crate::core::{InfraModel, Resource, ResourceKind, StageValue};
use crate::errors::StageError;
use async_trait::async_trait;
use std::fmt::Write;

/// Stage name of [`TerraformGenerationStage`].
pub const GENERATE_TERRAFORM: &str = "generate-terraform";

/// Renders a model as a Terraform configuration.
///
/// With templates enabled the output carries a `locals` block of common tags
/// merged into every resource; without, each resource only gets a `Name` tag.
///
/// Input: [`StageValue::Model`]. Output: [`StageValue::Text`].
#[derive(Debug, Clone)]
pub struct TerraformGenerationStage {
    use_templates: bool,
}

impl TerraformGenerationStage {
    /// Creates a generator.
    #[must_use]
    pub fn new(use_templates: bool) -> Self {
        Self { use_templates }
    }

    /// Renders `model` to HCL.
    #[must_use]
    pub fn render(&self, model: &InfraModel) -> String {
        let mut out = String::new();

        out.push_str(
            "terraform {\n  required_providers {\n    aws = {\n      source  = \"hashicorp/aws\"\n      version = \"~> 5.0\"\n    }\n  }\n}\n\n",
        );
        let _ = writeln!(out, "provider \"aws\" {{\n  region = {}\n}}", quote(&model.region));

        if self.use_templates {
            out.push_str(
                "\nlocals {\n  common_tags = {\n    ManagedBy = \"infragen\"\n  }\n}\n",
            );
        }

        for resource in &model.resources {
            out.push('\n');
            self.render_resource(&mut out, resource);
        }

        out
    }

    fn render_resource(&self, out: &mut String, resource: &Resource) {
        let _ = writeln!(
            out,
            "resource \"{}\" \"{}\" {{",
            resource_type(resource.kind),
            resource.identifier()
        );

        let width = resource
            .properties
            .keys()
            .map(String::len)
            .chain(std::iter::once("tags".len()))
            .max()
            .unwrap_or(0);

        for (key, value) in &resource.properties {
            let _ = writeln!(out, "  {key:<width$} = {}", hcl_value(value));
        }

        let name = quote(&resource.name);
        if self.use_templates {
            let _ = writeln!(
                out,
                "  {:<width$} = merge(local.common_tags, {{ Name = {name} }})",
                "tags"
            );
        } else {
            let _ = writeln!(out, "  {:<width$} = {{ Name = {name} }}", "tags");
        }
        out.push_str("}\n");
    }
}

/// Terraform resource type for a kind.
#[must_use]
pub fn resource_type(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Compute => "aws_instance",
        ResourceKind::Database => "aws_db_instance",
        ResourceKind::Storage => "aws_s3_bucket",
        ResourceKind::Network => "aws_vpc",
        ResourceKind::LoadBalancer => "aws_lb",
        ResourceKind::Cache => "aws_elasticache_cluster",
        ResourceKind::Queue => "aws_sqs_queue",
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn hcl_value(value: &str) -> String {
    if value.parse::<i64>().is_ok() {
        value.to_string()
    } else {
        quote(value)
    }
}

#[async_trait]
impl Stage for TerraformGenerationStage {
    fn name(&self) -> &str {
        GENERATE_TERRAFORM
    }

    async fn execute(&self, ctx: &RunContext, input: StageValue) -> Result<StageValue, StageError> {
        let model = input.into_model()?;
        ctx.check()?;
        Ok(StageValue::Text(self.render(&model)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> InfraModel {
        let mut model = InfraModel::new("us-west-2");
        model.resources.push(
            Resource::new("web-server-1", ResourceKind::Compute)
                .with_property("instance_type", "t3.micro"),
        );
        model.resources.push(
            Resource::new("database-1", ResourceKind::Database)
                .with_property("allocated_storage", "20")
                .with_property("engine", "postgres"),
        );
        model
    }

    #[test]
    fn test_render_provider_and_resources() {
        let hcl = TerraformGenerationStage::new(false).render(&sample_model());

        assert!(hcl.contains("provider \"aws\" {\n  region = \"us-west-2\"\n}"));
        assert!(hcl.contains("resource \"aws_instance\" \"web_server_1\" {"));
        assert!(hcl.contains("resource \"aws_db_instance\" \"database_1\" {"));
        assert!(hcl.contains("allocated_storage = 20"));
        assert!(hcl.contains("engine            = \"postgres\""));
        assert!(hcl.contains("= { Name = \"web-server-1\" }"));
        assert!(!hcl.contains("locals"));
    }

    #[test]
    fn test_render_with_templates_merges_common_tags() {
        let hcl = TerraformGenerationStage::new(true).render(&sample_model());

        assert!(hcl.contains("locals {\n  common_tags = {\n    ManagedBy = \"infragen\""));
        assert!(hcl.contains("merge(local.common_tags, { Name = \"database-1\" })"));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[tokio::test]
    async fn test_stage_produces_text() {
        let stage = TerraformGenerationStage::new(true);
        let output = stage
            .execute(&RunContext::new(), StageValue::Model(sample_model()))
            .await
            .unwrap();

        assert!(output.into_text().unwrap().starts_with("terraform {"));
    }
}
