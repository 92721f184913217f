//! Turns a [`RunConfig`] into a wired pipeline and runs it.

use super::catalog::{check_chain, BuiltinCatalog, OutputFormat, StageCatalog, WiredStage};
use super::executor::Pipeline;
use crate::cancellation::RunContext;
use crate::config::RunConfig;
use crate::core::{StageValue, ValueKind};
use crate::errors::{ConfigurationError, PipelineError};
use crate::events::ConsoleProgressReporter;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Where the description comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Inline description text.
    Inline(String),
    /// A file holding the description.
    File(PathBuf),
}

/// A configuration that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedRun {
    /// The description source.
    pub input: InputSource,
    /// The output format.
    pub format: OutputFormat,
    /// The manifest path, when a file should be written.
    pub output_path: Option<PathBuf>,
}

/// Validates configurations, wires stages from a catalog and runs them.
#[derive(Debug, Clone, Default)]
pub struct Coordinator<C = BuiltinCatalog> {
    catalog: C,
}

impl Coordinator<BuiltinCatalog> {
    /// Creates a coordinator over the built-in stages.
    #[must_use]
    pub fn new() -> Self {
        Self::with_catalog(BuiltinCatalog)
    }
}

impl<C> Coordinator<C>
where
    C: StageCatalog,
{
    /// Creates a coordinator over a custom catalog.
    #[must_use]
    pub fn with_catalog(catalog: C) -> Self {
        Self { catalog }
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Validates `config` without running anything.
    ///
    /// Checks run in order: input presence, format, input readability and
    /// output directory. The output directory is created as a side effect.
    pub async fn validate(&self, config: &RunConfig) -> Result<ValidatedRun, ConfigurationError> {
        let description = config
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty());
        let input = match (&config.input_file, description) {
            (Some(path), _) => InputSource::File(path.clone()),
            (None, Some(text)) => InputSource::Inline(text.to_string()),
            (None, None) => return Err(ConfigurationError::MissingInput),
        };

        let formats = self.catalog.formats();
        let format = OutputFormat::from_name(&config.format)
            .filter(|f| formats.contains(f))
            .ok_or_else(|| ConfigurationError::UnsupportedFormat {
                format: config.format.clone(),
                supported: formats.iter().map(|f| f.name().to_string()).collect(),
            })?;

        if let InputSource::File(path) = &input {
            tokio::fs::File::open(path)
                .await
                .map_err(|source| ConfigurationError::UnreadableInput {
                    path: path.clone(),
                    source,
                })?;
        }

        if let Some(dir) = &config.output_dir {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| ConfigurationError::OutputDirectory {
                    path: dir.clone(),
                    source,
                })?;
        }

        Ok(ValidatedRun {
            input,
            format,
            output_path: config.output_path(format.default_file_name()),
        })
    }

    /// Selects the stages for a validated run and checks their wiring.
    pub fn wire(
        &self,
        run: &ValidatedRun,
        config: &RunConfig,
    ) -> Result<Vec<WiredStage>, ConfigurationError> {
        let generator = self
            .catalog
            .generator(run.format, config.use_templates)
            .ok_or_else(|| ConfigurationError::UnsupportedFormat {
                format: run.format.name().to_string(),
                supported: self
                    .catalog
                    .formats()
                    .iter()
                    .map(|f| f.name().to_string())
                    .collect(),
            })?;

        let mut stages = vec![
            self.catalog.extractor(),
            self.catalog.model_builder(&config.region),
            generator,
        ];
        if let Some(path) = &run.output_path {
            stages.push(self.catalog.writer(path));
        }

        check_chain(&stages, ValueKind::Text)?;
        Ok(stages)
    }

    /// Reads the description text.
    pub async fn load_input(&self, run: &ValidatedRun) -> Result<String, ConfigurationError> {
        match &run.input {
            InputSource::Inline(text) => Ok(text.clone()),
            InputSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|source| {
                ConfigurationError::UnreadableInput {
                    path: path.clone(),
                    source,
                }
            }),
        }
    }

    /// Validates, wires and runs `config`, returning a caller-facing summary.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Configuration`] when validation or wiring fails, or
    /// the executor's error when the run fails.
    pub async fn run(&self, ctx: &RunContext, config: &RunConfig) -> Result<String, PipelineError> {
        let run = self.validate(config).await?;
        let stages = self.wire(&run, config)?;
        let input = self.load_input(&run).await?;

        let run_ctx = match config.timeout() {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.child(),
        };

        let pipeline = Pipeline::new(format!("infragen-{}", run.format));
        for wired in &stages {
            pipeline.add_stage(Arc::clone(&wired.stage));
        }

        if config.debug {
            pipeline.set_error_handler(|err: PipelineError| {
                error!(
                    stage = err.stage().unwrap_or("-"),
                    error = %err,
                    chain = %source_chain(&err),
                    "Pipeline run failed"
                );
                Err(err)
            });
        }

        let reporter = config
            .progress
            .as_ref()
            .map(|sink| Arc::new(ConsoleProgressReporter::new(Arc::clone(sink), stages.len())));
        if let Some(reporter) = &reporter {
            pipeline.set_progress_reporter(reporter.clone());
        }

        info!(
            format = %run.format,
            stages = stages.len(),
            output = ?run.output_path,
            "Starting generation run"
        );
        let result = pipeline.execute(&run_ctx, StageValue::Text(input)).await;

        if let Some(reporter) = reporter {
            reporter.shutdown().await;
        }

        let value = result?;
        Ok(summarize(run.format, run.output_path.is_some(), value))
    }
}

/// Describes the final value of a run.
#[must_use]
pub fn summarize(format: OutputFormat, has_destination: bool, value: StageValue) -> String {
    match value {
        StageValue::Text(text) if !has_destination => text,
        StageValue::Text(text) => format!(
            "Generated {} manifest ({} bytes)",
            format.display_name(),
            text.len()
        ),
        StageValue::Model(model) => format!(
            "Built infrastructure model with {} resources",
            model.resource_count()
        ),
        StageValue::Entities(entities) => format!("Extracted {} entities", entities.len()),
        StageValue::Path(path) => format!(
            "Wrote {} manifest to {}",
            format.display_name(),
            path.display()
        ),
    }
}

/// Renders an error followed by its sources.
fn source_chain(err: &dyn Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": caused by: ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}
