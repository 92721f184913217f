//! Infrastructure entities and the resource model built from them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The kinds of infrastructure the built-in stages understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A virtual machine.
    Compute,
    /// A managed relational database.
    Database,
    /// An object storage bucket.
    Storage,
    /// A virtual network.
    Network,
    /// A load balancer.
    LoadBalancer,
    /// A managed cache.
    Cache,
    /// A message queue.
    Queue,
}

impl ResourceKind {
    /// Base name used when naming generated resources.
    #[must_use]
    pub fn base_name(self) -> &'static str {
        match self {
            Self::Compute => "server",
            Self::Database => "database",
            Self::Storage => "bucket",
            Self::Network => "vpc",
            Self::LoadBalancer => "lb",
            Self::Cache => "cache",
            Self::Queue => "queue",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compute => write!(f, "compute"),
            Self::Database => write!(f, "database"),
            Self::Storage => write!(f, "storage"),
            Self::Network => write!(f, "network"),
            Self::LoadBalancer => write!(f, "load_balancer"),
            Self::Cache => write!(f, "cache"),
            Self::Queue => write!(f, "queue"),
        }
    }
}

/// A resource mention found in a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// What kind of resource was mentioned.
    pub kind: ResourceKind,
    /// How many were asked for.
    pub count: u32,
    /// An optional role qualifier (`web` in "3 web servers").
    pub qualifier: Option<String>,
    /// An optional engine or flavor (`postgres`, `redis`).
    pub engine: Option<String>,
    /// The matched text.
    pub mention: String,
}

impl Entity {
    /// Creates a single-count entity.
    #[must_use]
    pub fn new(kind: ResourceKind, mention: impl Into<String>) -> Self {
        Self {
            kind,
            count: 1,
            qualifier: None,
            engine: None,
            mention: mention.into(),
        }
    }

    /// Sets the count.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Sets the qualifier.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Sets the engine.
    #[must_use]
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }
}

/// A single concrete resource in the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique, manifest-safe name (`web-server-1`).
    pub name: String,
    /// The resource kind.
    pub kind: ResourceKind,
    /// Provider properties, sorted for stable rendering.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Resource {
    /// Creates a resource with no properties.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            properties: BTreeMap::new(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns the name with dashes replaced, for HCL identifiers.
    #[must_use]
    pub fn identifier(&self) -> String {
        self.name.replace('-', "_")
    }
}

/// The resource model a generator renders.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InfraModel {
    /// Target region.
    pub region: String,
    /// Resources in declaration order.
    pub resources: Vec<Resource>,
}

impl InfraModel {
    /// Creates an empty model for a region.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            resources: Vec::new(),
        }
    }

    /// Returns the number of resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Returns resources of one kind.
    pub fn resources_of(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_identifier() {
        let resource = Resource::new("web-server-1", ResourceKind::Compute);
        assert_eq!(resource.identifier(), "web_server_1");
    }

    #[test]
    fn test_model_filters_by_kind() {
        let mut model = InfraModel::new("eu-west-1");
        model.resources.push(Resource::new("server-1", ResourceKind::Compute));
        model.resources.push(Resource::new("bucket-1", ResourceKind::Storage));
        model.resources.push(Resource::new("server-2", ResourceKind::Compute));

        assert_eq!(model.resource_count(), 3);
        assert_eq!(model.resources_of(ResourceKind::Compute).count(), 2);
    }

    #[test]
    fn test_resource_kind_serialize() {
        let json = serde_json::to_string(&ResourceKind::LoadBalancer).unwrap();
        assert_eq!(json, r#""load_balancer""#);
    }
}
