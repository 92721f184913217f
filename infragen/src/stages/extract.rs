//! Regex-based entity extraction from free text.

use super::Stage;
use crate::cancellation::RunContext;
use crate::core::{Entity, ResourceKind, StageValue};
use crate::errors::StageError;
use async_trait::async_trait;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

/// Stage name of [`EntityExtractionStage`].
pub const EXTRACT_ENTITIES: &str = "extract-entities";

/// Upper bound on a single mention's count.
const MAX_COUNT: u32 = 50;

static ENTITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        \b
        (?:(?P<count>\d+|an?|one|two|three|four|five|six|seven|eight|nine|ten)\s+)?
        (?:(?P<qualifier>web|app|api|worker|backend|frontend|bastion|primary|replica
            |private|public|static|assets|media|logs?|backups?|sessions?|jobs?|tasks?
            |events?|postgres(?:ql)?|mysql|mariadb|redis|memcached|s3|sqs)\s+)?
        (?P<noun>virtual\s+machines?|vms?|servers?|instances?|hosts?
            |databases?|dbs?|postgres(?:ql)?|mysql|mariadb
            |buckets?|object\s+storage
            |vpcs?|networks?
            |load\s+balancers?|lbs?
            |caches?|redis|memcached
            |queues?|sqs)
        \b",
    )
    .expect("entity pattern is a valid regex")
});

/// Extracts infrastructure entities from a description.
///
/// Input: [`StageValue::Text`]. Output: [`StageValue::Entities`].
#[derive(Debug, Clone, Default)]
pub struct EntityExtractionStage;

impl EntityExtractionStage {
    /// Creates a new extraction stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Extracts entities from `text` without the stage wrapper.
    pub fn extract(text: &str) -> Result<Vec<Entity>, StageError> {
        ENTITY_PATTERN
            .captures_iter(text)
            .filter_map(|caps| entity_from(&caps).transpose())
            .collect()
    }
}

#[async_trait]
impl Stage for EntityExtractionStage {
    fn name(&self) -> &str {
        EXTRACT_ENTITIES
    }

    async fn execute(&self, ctx: &RunContext, input: StageValue) -> Result<StageValue, StageError> {
        let text = input.into_text()?;
        ctx.check()?;

        let entities = Self::extract(&text)?;
        if entities.is_empty() {
            return Err(StageError::failed(
                "no infrastructure resources found in description",
            ));
        }

        debug!(count = entities.len(), "Extracted entities");
        Ok(StageValue::Entities(entities))
    }
}

fn entity_from(caps: &Captures<'_>) -> Result<Option<Entity>, StageError> {
    let mention = caps.get(0).map_or("", |m| m.as_str());
    let noun = caps
        .name("noun")
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_default();

    let Some((kind, noun_engine)) = classify(&noun) else {
        return Ok(None);
    };

    let count = match caps.name("count") {
        Some(m) => parse_count(m.as_str())?,
        None => 1,
    };
    if count == 0 {
        return Ok(None);
    }

    let mut entity = Entity::new(kind, mention).with_count(count);
    if let Some(engine) = noun_engine {
        entity = entity.with_engine(engine);
    }
    if let Some(qualifier) = caps.name("qualifier") {
        let qualifier = qualifier.as_str().to_ascii_lowercase();
        match engine_name(&qualifier) {
            Some(engine) => entity = entity.with_engine(engine),
            None => entity = entity.with_qualifier(qualifier),
        }
    }

    Ok(Some(entity))
}

fn classify(noun: &str) -> Option<(ResourceKind, Option<&'static str>)> {
    let noun = noun.split_whitespace().collect::<Vec<_>>().join(" ");
    let singular = noun.strip_suffix('s').unwrap_or(&noun);

    let found = match singular {
        "virtual machine" | "vm" | "server" | "instance" | "host" => (ResourceKind::Compute, None),
        "database" | "db" => (ResourceKind::Database, None),
        "postgre" | "postgresql" => (ResourceKind::Database, Some("postgres")),
        "mysql" => (ResourceKind::Database, Some("mysql")),
        "mariadb" => (ResourceKind::Database, Some("mariadb")),
        "bucket" | "object storage" => (ResourceKind::Storage, None),
        "vpc" | "network" => (ResourceKind::Network, None),
        "load balancer" | "lb" => (ResourceKind::LoadBalancer, None),
        "cache" => (ResourceKind::Cache, None),
        "redi" | "redis" => (ResourceKind::Cache, Some("redis")),
        "memcached" => (ResourceKind::Cache, Some("memcached")),
        "queue" | "sq" | "sqs" => (ResourceKind::Queue, None),
        _ => return None,
    };
    Some(found)
}

fn engine_name(word: &str) -> Option<&'static str> {
    match word {
        "postgres" | "postgresql" => Some("postgres"),
        "mysql" => Some("mysql"),
        "mariadb" => Some("mariadb"),
        "redis" => Some("redis"),
        "memcached" => Some("memcached"),
        _ => None,
    }
}

fn parse_count(word: &str) -> Result<u32, StageError> {
    let count = match word.to_ascii_lowercase().as_str() {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        digits => digits
            .parse::<u32>()
            .map_err(|_| StageError::failed(format!("count '{digits}' is not a valid number")))?,
    };

    if count > MAX_COUNT {
        return Err(StageError::failed(format!(
            "refusing to generate {count} resources from one mention (max {MAX_COUNT})"
        )));
    }
    Ok(count)
}
