//! Run command orchestrator
//!
//! Builds the concrete pipeline from configuration (metadata store, process
//! validator, report writer), drives one run and presents its summary.

use crate::error::{CliError, CliResult, ExitCode};
use crate::progress::{create_progress_infrastructure, format_elapsed_ms, render_progress};
use anyhow::Context;
use bitcheck_core::progress::{NullProvider, ProgressProvider};
use bitcheck_core::{
    FormatLookup, MetadataStore, PipelineConfig, ProcessValidator, RecordSource, ReportWriter,
    RunOptions, RunOrchestrator, RunState, RunSummary, Validator,
};
use colored::*;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How the run summary is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    /// Pick the format from an explicit flag, then the configured default
    ///
    /// `auto` (and anything unrecognised) means human output on an interactive
    /// terminal and JSON otherwise.
    pub fn resolve(explicit: Option<OutputFormat>, configured: &str, interactive: bool) -> Self {
        if let Some(format) = explicit {
            return format;
        }
        match configured {
            "human" => OutputFormat::Human,
            "json" => OutputFormat::Json,
            _ if interactive => OutputFormat::Human,
            _ => OutputFormat::Json,
        }
    }
}

/// Run command options
#[derive(Debug, Clone)]
pub struct RunCommandOptions {
    pub run: RunOptions,
    pub format: OutputFormat,
    pub show_progress: bool,
}

impl Default for RunCommandOptions {
    fn default() -> Self {
        Self {
            run: RunOptions::default(),
            format: OutputFormat::Human,
            show_progress: false,
        }
    }
}

/// Orchestrator for the run command
pub struct RunCommandOrchestrator {
    config: PipelineConfig,
    options: RunCommandOptions,
    cancel: Arc<AtomicBool>,
}

impl RunCommandOrchestrator {
    /// Create a new orchestrator, rejecting unusable configuration up front
    pub fn new(config: PipelineConfig, options: RunCommandOptions) -> CliResult<Self> {
        config
            .validate()
            .map_err(|e| CliError::from_core(e.into()))?;
        debug!("Creating run orchestrator with options: {options:?}");

        Ok(Self {
            config,
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops the run before its next asset
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Connect to the metadata store and run against it
    pub async fn execute(&self) -> CliResult<RunSummary> {
        let store = Arc::new(
            MetadataStore::connect(&self.config.store)
                .await
                .map_err(CliError::from_core)?,
        );
        info!("Connected to metadata store, collection {}", store.collection_id());
        let validator = Arc::new(ProcessValidator::from_config(&self.config.validator));

        let summary = self
            .execute_with(store.clone(), store.clone(), validator)
            .await;

        store.close().await;
        Ok(summary)
    }

    /// Run with the given components
    pub async fn execute_with(
        &self,
        source: Arc<dyn RecordSource>,
        formats: Arc<dyn FormatLookup>,
        validator: Arc<dyn Validator>,
    ) -> RunSummary {
        self.announce();

        let interrupt = self.listen_for_interrupt();

        let (provider, renderer) = if self.options.show_progress {
            let (provider, rx) = create_progress_infrastructure();
            (provider, Some(tokio::spawn(render_progress(rx))))
        } else {
            (Arc::new(NullProvider) as Arc<dyn ProgressProvider>, None)
        };

        let mut orchestrator = RunOrchestrator::new(
            source,
            formats,
            validator,
            ReportWriter::new(&self.config.storage.output_dir),
            &self.config.storage.asset_root,
        )
        .with_progress(provider)
        .with_cancel_flag(self.cancel.clone());

        let summary = orchestrator.run(&self.options.run).await;

        // The orchestrator completes the provider, which closes the channel
        if let Some(handle) = renderer {
            let _ = tokio::time::timeout(Duration::from_millis(500), handle).await;
        }
        interrupt.abort();

        summary
    }

    /// Set the cancel flag on Ctrl-C; the run stops between assets
    fn listen_for_interrupt(&self) -> tokio::task::JoinHandle<()> {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current asset");
                cancel.store(true, Ordering::SeqCst);
            }
        })
    }

    fn announce(&self) {
        if self.options.format != OutputFormat::Human {
            return;
        }
        eprintln!(
            "{}",
            format!(
                "Validating collection {} with {}",
                self.config.store.collection_id,
                self.config.validator.executable.display()
            )
            .cyan()
            .bold()
        );
        if self.options.run.dry_run {
            eprintln!(
                "{}",
                "DRY RUN MODE - The validator will not be invoked".yellow()
            );
        }
    }

    /// Print the summary in the configured format
    pub fn display(&self, summary: &RunSummary) -> anyhow::Result<()> {
        match self.options.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(summary)
                    .context("Failed to serialize run summary")?;
                println!("{json}");
            }
            OutputFormat::Human => {
                print!("{}", render_human(summary));
            }
        }
        Ok(())
    }
}

/// Human-readable run summary
pub fn render_human(summary: &RunSummary) -> String {
    let mut out = String::new();

    for plan in &summary.planned {
        out.push_str(&format!(
            "{} {} ({})\n    {}\n",
            format!("[{}]", plan.sequence).dimmed(),
            plan.display_name.cyan(),
            plan.profile,
            plan.command_line
        ));
    }
    if !summary.planned.is_empty() {
        out.push('\n');
    }

    let title = if summary.state == RunState::Aborted {
        "Run Aborted".red().bold()
    } else {
        "Run Summary".green().bold()
    };
    out.push_str(&format!("{title}\n"));
    out.push_str(&format!(
        "  Started:              {}\n",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("  Assets:               {}\n", summary.total));
    out.push_str(&format!("  Processed:            {}\n", summary.processed));
    out.push_str(&format!(
        "  {} Valid:              {}\n",
        "●".green(),
        summary.succeeded
    ));
    out.push_str(&format!(
        "  {} Validation failed:  {}\n",
        "●".yellow(),
        summary.validation_failures
    ));
    out.push_str(&format!(
        "  {} Errors:             {}\n",
        "●".red(),
        summary.errors
    ));
    out.push_str(&format!(
        "  Elapsed:              {}\n",
        format_elapsed_ms(summary.elapsed_ms)
    ));
    out.push_str(&format!(
        "  Next sequence:        {}\n",
        summary.next_sequence
    ));

    if !summary.failures.is_empty() {
        out.push_str(&format!("\n{}\n", "Failures:".bold()));
        for failure in &summary.failures {
            let sequence = failure
                .sequence
                .map(|n| format!("[{n}] "))
                .unwrap_or_default();
            out.push_str(&format!(
                "  {}{} ({}) {}: {}\n",
                sequence,
                failure.display_name,
                failure.identifier,
                failure.stage.to_string().yellow(),
                failure.message
            ));
        }
    }

    out.push('\n');
    out.push_str(&summary.headline());
    out.push('\n');
    out
}

/// Process exit code for a finished run
///
/// Per-asset failures do not fail the process; only an aborted run does.
pub fn exit_code_for(summary: &RunSummary) -> ExitCode {
    match &summary.abort {
        Some(reason) => CliError::from_abort(reason).exit_code(),
        None => ExitCode::Success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_resolution() {
        assert_eq!(
            OutputFormat::resolve(Some(OutputFormat::Json), "human", true),
            OutputFormat::Json
        );
        assert_eq!(
            OutputFormat::resolve(None, "human", false),
            OutputFormat::Human
        );
        assert_eq!(OutputFormat::resolve(None, "auto", true), OutputFormat::Human);
        assert_eq!(OutputFormat::resolve(None, "auto", false), OutputFormat::Json);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = PipelineConfig::default();
        config.store.url = String::new();

        let err = RunCommandOrchestrator::new(config, RunCommandOptions::default())
            .err()
            .unwrap();

        assert_eq!(err.exit_code(), ExitCode::Misuse);
    }
}
