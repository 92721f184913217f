//! Run configuration.

use crate::events::ProgressSink;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Everything the coordinator needs for one run.
///
/// Deserializable so an outer CLI or config loader can fill it. The progress
/// sink is runtime-only and never serialized.
#[derive(Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Inline infrastructure description.
    #[serde(default)]
    pub description: Option<String>,
    /// File to read the description from. Wins over `description`.
    #[serde(default)]
    pub input_file: Option<PathBuf>,
    /// Output format name.
    #[serde(default = "default_format")]
    pub format: String,
    /// Directory to write the manifest into. No file is written when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Manifest file name inside `output_dir`.
    #[serde(default)]
    pub output_file: Option<String>,
    /// Cloud region attached to every resource.
    #[serde(default = "default_region")]
    pub region: String,
    /// Whether generators add common tags and labels.
    #[serde(default = "default_use_templates")]
    pub use_templates: bool,
    /// Verbose logging and error-chain reporting.
    #[serde(default)]
    pub debug: bool,
    /// Overall run timeout in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<f64>,
    /// Destination for human-readable progress lines.
    #[serde(skip)]
    pub progress: Option<Arc<dyn ProgressSink>>,
}

fn default_format() -> String {
    "terraform".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_use_templates() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            description: None,
            input_file: None,
            format: default_format(),
            output_dir: None,
            output_file: None,
            region: default_region(),
            use_templates: default_use_templates(),
            debug: false,
            timeout_seconds: None,
            progress: None,
        }
    }
}

impl RunConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the inline description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the input file.
    #[must_use]
    pub fn with_input_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_file = Some(path.into());
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Sets the output file name.
    #[must_use]
    pub fn with_output_file(mut self, name: impl Into<String>) -> Self {
        self.output_file = Some(name.into());
        self
    }

    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Enables or disables templates.
    #[must_use]
    pub fn with_templates(mut self, use_templates: bool) -> Self {
        self.use_templates = use_templates;
        self
    }

    /// Enables or disables debug mode.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the run timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Sets the progress sink.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Gets the timeout as a Duration.
    ///
    /// Non-positive or non-finite values mean no timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds
            .filter(|s| *s > 0.0)
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
    }

    /// Resolves the manifest path, falling back to `default_file_name`.
    #[must_use]
    pub fn output_path(&self, default_file_name: &str) -> Option<PathBuf> {
        self.output_dir.as_deref().map(|dir: &Path| {
            dir.join(self.output_file.as_deref().unwrap_or(default_file_name))
        })
    }
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("description", &self.description)
            .field("input_file", &self.input_file)
            .field("format", &self.format)
            .field("output_dir", &self.output_dir)
            .field("output_file", &self.output_file)
            .field("region", &self.region)
            .field("use_templates", &self.use_templates)
            .field("debug", &self.debug)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.format, "terraform");
        assert_eq!(config.region, "us-east-1");
        assert!(config.use_templates);
        assert!(!config.debug);
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: RunConfig =
            serde_json::from_str(r#"{"description": "a vpc", "format": "crossplane"}"#).unwrap();
        assert_eq!(config.description.as_deref(), Some("a vpc"));
        assert_eq!(config.format, "crossplane");
        assert_eq!(config.region, "us-east-1");
        assert!(config.use_templates);
        assert!(config.progress.is_none());
    }

    #[test]
    fn test_timeout() {
        assert_eq!(
            RunConfig::new().with_timeout(1.5).timeout(),
            Some(Duration::from_millis(1500))
        );
        assert!(RunConfig::new().with_timeout(0.0).timeout().is_none());
        assert!(RunConfig::new().with_timeout(-3.0).timeout().is_none());
    }

    #[test]
    fn test_output_path() {
        let config = RunConfig::new().with_output_dir("/tmp/out");
        assert_eq!(
            config.output_path("main.tf"),
            Some(PathBuf::from("/tmp/out/main.tf"))
        );

        let named = config.with_output_file("infra.tf");
        assert_eq!(
            named.output_path("main.tf"),
            Some(PathBuf::from("/tmp/out/infra.tf"))
        );
        assert!(RunConfig::new().output_path("main.tf").is_none());
    }

    #[test]
    fn test_debug_hides_sink() {
        let config = RunConfig::new().with_progress(Arc::new(crate::events::MemorySink::new()));
        let rendered = format!("{config:?}");
        assert!(rendered.contains("progress: true"));
    }
}
