//! Builds the resource model from extracted entities.

use super::Stage;
use crate::cancellation::RunContext;
use crate::core::{Entity, InfraModel, Resource, ResourceKind, StageValue};
use crate::errors::StageError;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Stage name of [`ModelBuildingStage`].
pub const BUILD_MODEL: &str = "build-model";

/// Expands entities into named resources for one region.
///
/// Input: [`StageValue::Entities`]. Output: [`StageValue::Model`].
#[derive(Debug, Clone)]
pub struct ModelBuildingStage {
    region: String,
}

impl ModelBuildingStage {
    /// Creates a builder for `region`.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    /// Returns the configured region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Builds the model without the stage wrapper.
    pub fn build(&self, entities: &[Entity]) -> Result<InfraModel, StageError> {
        if self.region.trim().is_empty() {
            return Err(StageError::failed("region must not be empty"));
        }
        if entities.is_empty() {
            return Err(StageError::failed("no entities to build a model from"));
        }

        let mut model = InfraModel::new(self.region.trim());
        let mut counters: HashMap<String, u32> = HashMap::new();
        let mut networks = 0u32;

        for entity in entities {
            let base = match &entity.qualifier {
                Some(qualifier) => format!("{qualifier}-{}", entity.kind.base_name()),
                None => entity.kind.base_name().to_string(),
            };

            for _ in 0..entity.count {
                let n = counters.entry(base.clone()).or_insert(0);
                *n += 1;
                let name = format!("{base}-{n}");

                let resource = match entity.kind {
                    ResourceKind::Network => {
                        let block = format!("10.{networks}.0.0/16");
                        networks += 1;
                        Resource::new(name, entity.kind).with_property("cidr_block", block)
                    }
                    _ => with_defaults(Resource::new(name, entity.kind), entity),
                };
                model.resources.push(resource);
            }
        }

        Ok(model)
    }
}

fn with_defaults(resource: Resource, entity: &Entity) -> Resource {
    let engine = entity.engine.as_deref();
    match resource.kind {
        ResourceKind::Compute => resource.with_property("instance_type", "t3.micro"),
        ResourceKind::Database => resource
            .with_property("engine", engine.unwrap_or("postgres"))
            .with_property("instance_class", "db.t3.micro")
            .with_property("allocated_storage", "20"),
        ResourceKind::Storage => {
            let bucket = resource.name.clone();
            resource.with_property("bucket", bucket)
        }
        ResourceKind::LoadBalancer => resource.with_property("load_balancer_type", "application"),
        ResourceKind::Cache => resource
            .with_property("engine", engine.unwrap_or("redis"))
            .with_property("node_type", "cache.t3.micro")
            .with_property("num_cache_nodes", "1"),
        ResourceKind::Queue => {
            let queue = resource.name.clone();
            resource
                .with_property("name", queue)
                .with_property("visibility_timeout_seconds", "30")
        }
        ResourceKind::Network => resource,
    }
}

#[async_trait]
impl Stage for ModelBuildingStage {
    fn name(&self) -> &str {
        BUILD_MODEL
    }

    async fn execute(&self, ctx: &RunContext, input: StageValue) -> Result<StageValue, StageError> {
        let entities = input.into_entities()?;
        ctx.check()?;

        let model = self.build(&entities)?;
        debug!(
            region = %model.region,
            resources = model.resource_count(),
            "Built resource model"
        );
        Ok(StageValue::Model(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expands_counts_with_unique_names() {
        let entities = vec![
            Entity::new(ResourceKind::Compute, "3 web servers")
                .with_count(3)
                .with_qualifier("web"),
            Entity::new(ResourceKind::Compute, "a server"),
        ];

        let model = ModelBuildingStage::new("eu-west-1").build(&entities).unwrap();
        let names: Vec<_> = model.resources.iter().map(|r| r.name.as_str()).collect();

        assert_eq!(model.region, "eu-west-1");
        assert_eq!(names, vec!["web-server-1", "web-server-2", "web-server-3", "server-1"]);
    }

    #[test]
    fn test_database_defaults_use_engine() {
        let entities = vec![Entity::new(ResourceKind::Database, "a mysql db").with_engine("mysql")];

        let model = ModelBuildingStage::new("us-east-1").build(&entities).unwrap();
        let db = &model.resources[0];

        assert_eq!(db.properties.get("engine").map(String::as_str), Some("mysql"));
        assert_eq!(db.properties.get("allocated_storage").map(String::as_str), Some("20"));
    }

    #[test]
    fn test_networks_get_distinct_cidrs() {
        let entities = vec![Entity::new(ResourceKind::Network, "two vpcs").with_count(2)];

        let model = ModelBuildingStage::new("us-east-1").build(&entities).unwrap();
        let cidrs: Vec<_> = model
            .resources
            .iter()
            .filter_map(|r| r.properties.get("cidr_block").cloned())
            .collect();

        assert_eq!(cidrs, vec!["10.0.0.0/16", "10.1.0.0/16"]);
    }

    #[test]
    fn test_empty_region_rejected() {
        let entities = vec![Entity::new(ResourceKind::Queue, "a queue")];
        let err = ModelBuildingStage::new("  ").build(&entities).unwrap_err();
        assert_eq!(err.to_string(), "region must not be empty");
    }

    #[tokio::test]
    async fn test_stage_rejects_text_input() {
        let stage = ModelBuildingStage::new("us-east-1");
        let err = stage
            .execute(&RunContext::new(), StageValue::from("3 servers"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "invalid input: expected entities, got text");
    }
}
