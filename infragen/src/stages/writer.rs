//! Writes the rendered manifest to disk.

use super::Stage;
use crate::cancellation::RunContext;
use crate::core::StageValue;
use crate::errors::StageError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Stage name of [`OutputWriterStage`].
pub const WRITE_OUTPUT: &str = "write-output";

/// Writes text to a fixed path, creating parent directories.
///
/// Input: [`StageValue::Text`]. Output: [`StageValue::Path`].
#[derive(Debug, Clone)]
pub struct OutputWriterStage {
    path: PathBuf,
}

impl OutputWriterStage {
    /// Creates a writer targeting `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the target path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Stage for OutputWriterStage {
    fn name(&self) -> &str {
        WRITE_OUTPUT
    }

    async fn execute(&self, ctx: &RunContext, input: StageValue) -> Result<StageValue, StageError> {
        let content = input.into_text()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        ctx.check()?;
        tokio::fs::write(&self.path, content.as_bytes()).await?;

        info!(path = %self.path.display(), bytes = content.len(), "Wrote manifest");
        Ok(StageValue::Path(self.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_file_and_returns_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("main.tf");
        let stage = OutputWriterStage::new(&target);

        let output = stage
            .execute(&RunContext::new(), StageValue::from("resource {}"))
            .await
            .unwrap();

        assert_eq!(output, StageValue::Path(target.clone()));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "resource {}");
    }

    #[tokio::test]
    async fn test_does_not_write_after_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("main.tf");
        let stage = OutputWriterStage::new(&target);
        let ctx = RunContext::new();
        ctx.cancel("stop");

        let err = stage
            .execute(&ctx, StageValue::from("resource {}"))
            .await
            .unwrap_err();

        assert!(matches!(err, StageError::Canceled(_)));
        assert!(!target.exists());
    }
}
