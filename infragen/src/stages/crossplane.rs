//! Crossplane managed-resource generation.

use super::Stage;
use crate::cancellation::RunContext;
use crate::core::{InfraModel, Resource, ResourceKind, StageValue};
use crate::errors::StageError;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

/// Stage name of [`CrossplaneGenerationStage`].
pub const GENERATE_CROSSPLANE: &str = "generate-crossplane";

/// Renders a model as multi-document Crossplane YAML.
///
/// Input: [`StageValue::Model`]. Output: [`StageValue::Text`].
#[derive(Debug, Clone)]
pub struct CrossplaneGenerationStage {
    use_templates: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManagedResource {
    api_version: &'static str,
    kind: &'static str,
    metadata: Metadata,
    spec: Spec,
}

#[derive(Debug, Serialize)]
struct Metadata {
    name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Spec {
    for_provider: BTreeMap<String, Property>,
    provider_config_ref: ProviderConfigRef,
}

#[derive(Debug, Serialize)]
struct ProviderConfigRef {
    name: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Property {
    Int(i64),
    Str(String),
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        value
            .parse::<i64>()
            .map_or_else(|_| Self::Str(value.to_string()), Self::Int)
    }
}

impl CrossplaneGenerationStage {
    /// Creates a generator.
    #[must_use]
    pub fn new(use_templates: bool) -> Self {
        Self { use_templates }
    }

    /// Renders `model` to YAML documents separated by `---`.
    pub fn render(&self, model: &InfraModel) -> Result<String, StageError> {
        let mut documents = Vec::with_capacity(model.resources.len());
        for resource in &model.resources {
            let manifest = self.manifest(resource, &model.region);
            documents.push(serde_yml::to_string(&manifest)?);
        }
        Ok(documents
            .iter()
            .map(|doc| format!("---\n{doc}"))
            .collect::<String>())
    }

    fn manifest(&self, resource: &Resource, region: &str) -> ManagedResource {
        let (api_version, kind) = api_type(resource.kind);

        let mut for_provider: BTreeMap<String, Property> = resource
            .properties
            .iter()
            .map(|(key, value)| (camel_case(key), Property::from(value.as_str())))
            .collect();
        for_provider.insert("region".to_string(), Property::Str(region.to_string()));

        let mut labels = BTreeMap::new();
        if self.use_templates {
            labels.insert(
                "app.kubernetes.io/managed-by".to_string(),
                "infragen".to_string(),
            );
            labels.insert("infragen.io/kind".to_string(), resource.kind.to_string());
        }

        ManagedResource {
            api_version,
            kind,
            metadata: Metadata {
                name: resource.name.clone(),
                labels,
            },
            spec: Spec {
                for_provider,
                provider_config_ref: ProviderConfigRef { name: "default" },
            },
        }
    }
}

/// Crossplane `apiVersion` and `kind` for a resource kind.
#[must_use]
pub fn api_type(kind: ResourceKind) -> (&'static str, &'static str) {
    match kind {
        ResourceKind::Compute => ("ec2.aws.upbound.io/v1beta1", "Instance"),
        ResourceKind::Database => ("rds.aws.upbound.io/v1beta1", "Instance"),
        ResourceKind::Storage => ("s3.aws.upbound.io/v1beta1", "Bucket"),
        ResourceKind::Network => ("ec2.aws.upbound.io/v1beta1", "VPC"),
        ResourceKind::LoadBalancer => ("elbv2.aws.upbound.io/v1beta1", "LB"),
        ResourceKind::Cache => ("elasticache.aws.upbound.io/v1beta1", "Cluster"),
        ResourceKind::Queue => ("sqs.aws.upbound.io/v1beta1", "Queue"),
    }
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for ch in key.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[async_trait]
impl Stage for CrossplaneGenerationStage {
    fn name(&self) -> &str {
        GENERATE_CROSSPLANE
    }

    async fn execute(&self, ctx: &RunContext, input: StageValue) -> Result<StageValue, StageError> {
        let model = input.into_model()?;
        ctx.check()?;
        Ok(StageValue::Text(self.render(&model)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> InfraModel {
        let mut model = InfraModel::new("eu-central-1");
        model.resources.push(
            Resource::new("cache-1", ResourceKind::Cache)
                .with_property("node_type", "cache.t3.micro")
                .with_property("num_cache_nodes", "1"),
        );
        model
            .resources
            .push(Resource::new("bucket-1", ResourceKind::Storage));
        model
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("num_cache_nodes"), "numCacheNodes");
        assert_eq!(camel_case("engine"), "engine");
    }

    #[test]
    fn test_render_documents() {
        let yaml = CrossplaneGenerationStage::new(false)
            .render(&sample_model())
            .unwrap();

        assert_eq!(yaml.matches("---\n").count(), 2);
        assert!(yaml.contains("apiVersion: elasticache.aws.upbound.io/v1beta1"));
        assert!(yaml.contains("kind: Cluster"));
        assert!(yaml.contains("numCacheNodes: 1"));
        assert!(yaml.contains("region: eu-central-1"));
        assert!(!yaml.contains("labels"));
    }

    #[test]
    fn test_render_parses_back() {
        let yaml = CrossplaneGenerationStage::new(true)
            .render(&sample_model())
            .unwrap();

        let first = yaml.split("---\n").nth(1).unwrap();
        let value: serde_yml::Value = serde_yml::from_str(first).unwrap();

        assert_eq!(value["metadata"]["name"].as_str(), Some("cache-1"));
        assert_eq!(
            value["metadata"]["labels"]["app.kubernetes.io/managed-by"].as_str(),
            Some("infragen")
        );
        assert_eq!(value["spec"]["providerConfigRef"]["name"].as_str(), Some("default"));
    }
}
