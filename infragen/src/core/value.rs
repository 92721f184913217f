//! Values passed between pipeline stages.

use super::{Entity, InfraModel};
use crate::errors::StageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The runtime shape of a [`StageValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Free text or a rendered manifest.
    Text,
    /// Extracted entities.
    Entities,
    /// A structured resource model.
    Model,
    /// A path to a written file.
    Path,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Entities => write!(f, "entities"),
            Self::Model => write!(f, "model"),
            Self::Path => write!(f, "path"),
        }
    }
}

/// A value flowing from one stage to the next.
#[derive(Debug, Clone, PartialEq)]
pub enum StageValue {
    /// Free text or a rendered manifest.
    Text(String),
    /// Entities extracted from a description.
    Entities(Vec<Entity>),
    /// A resource model.
    Model(InfraModel),
    /// The location of a written file.
    Path(PathBuf),
}

impl StageValue {
    /// Returns the kind of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Entities(_) => ValueKind::Entities,
            Self::Model(_) => ValueKind::Model,
            Self::Path(_) => ValueKind::Path,
        }
    }

    /// Takes the text payload.
    pub fn into_text(self) -> Result<String, StageError> {
        match self {
            Self::Text(text) => Ok(text),
            other => Err(StageError::invalid_input(ValueKind::Text, other.kind())),
        }
    }

    /// Takes the entities payload.
    pub fn into_entities(self) -> Result<Vec<Entity>, StageError> {
        match self {
            Self::Entities(entities) => Ok(entities),
            other => Err(StageError::invalid_input(ValueKind::Entities, other.kind())),
        }
    }

    /// Takes the model payload.
    pub fn into_model(self) -> Result<InfraModel, StageError> {
        match self {
            Self::Model(model) => Ok(model),
            other => Err(StageError::invalid_input(ValueKind::Model, other.kind())),
        }
    }

    /// Takes the path payload.
    pub fn into_path(self) -> Result<PathBuf, StageError> {
        match self {
            Self::Path(path) => Ok(path),
            other => Err(StageError::invalid_input(ValueKind::Path, other.kind())),
        }
    }
}

impl From<String> for StageValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for StageValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kind_display() {
        assert_eq!(ValueKind::Text.to_string(), "text");
        assert_eq!(ValueKind::Entities.to_string(), "entities");
        assert_eq!(ValueKind::Model.to_string(), "model");
        assert_eq!(ValueKind::Path.to_string(), "path");
    }

    #[test]
    fn test_into_text() {
        let value = StageValue::from("two servers");
        assert_eq!(value.kind(), ValueKind::Text);
        assert_eq!(value.into_text().unwrap(), "two servers");
    }

    #[test]
    fn test_wrong_kind_is_invalid_input() {
        let value = StageValue::Path(PathBuf::from("/tmp/main.tf"));
        let err = value.into_model().unwrap_err();

        match err {
            StageError::InvalidInput { expected, actual } => {
                assert_eq!(expected, ValueKind::Model);
                assert_eq!(actual, ValueKind::Path);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_entities_roundtrip() {
        let value = StageValue::Entities(Vec::new());
        assert!(value.into_entities().unwrap().is_empty());
    }
}
