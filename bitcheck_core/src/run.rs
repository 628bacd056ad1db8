//! Run orchestration
//!
//! A run walks one snapshot of tracked assets and, for each asset in turn,
//! resolves its location, looks up its declared format, allocates a report
//! path, invokes the validator and annotates the report. Items are processed
//! strictly one after another.
//!
//! Per-item failures are recorded and the run continues. Only a failing
//! record source, an unreachable store, an unlaunchable validator or an
//! operator interrupt end the run early.

use crate::dispatcher::Validator;
use crate::error::{Error, QueryStage};
use crate::format::ValidationProfile;
use crate::model::AssetRecord;
use crate::paths::resolve_location;
use crate::progress::{NullProvider, ProgressProvider, ProgressUpdate};
use crate::report::{OutputSequence, ReportWriter};
use crate::source::{FormatLookup, RecordSource};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted,
}

/// Why a run stopped before the end of its snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "message", rename_all = "snake_case")]
pub enum AbortReason {
    /// The record snapshot could not be fetched
    RecordSource(String),
    /// The store failed while looking up a format
    Store(String),
    /// The validator could not be started
    Launch(String),
    /// The output directory could not be created
    OutputDir(String),
    /// The operator asked the run to stop
    Interrupted,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::RecordSource(msg) => write!(f, "record source failed: {msg}"),
            AbortReason::Store(msg) => write!(f, "metadata store failed: {msg}"),
            AbortReason::Launch(msg) => write!(f, "validator could not start: {msg}"),
            AbortReason::OutputDir(msg) => write!(f, "output directory unusable: {msg}"),
            AbortReason::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// Pipeline stage an item failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FormatLookup,
    Validate,
    Annotate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::FormatLookup => "format lookup",
            Stage::Validate => "validate",
            Stage::Annotate => "annotate",
        })
    }
}

/// How one asset ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    /// Validator exited 0 and the report was annotated
    Valid,
    /// Validator ran but exited non-zero; the report was annotated
    ValidationFailure { exit_status: i32 },
    /// A per-item error stopped this asset
    Failed { stage: Stage },
    /// Dry run: nothing was executed
    Planned,
}

/// The record of one completed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub asset: AssetRecord,
    pub report_path: PathBuf,
    pub process_stderr: String,
    pub exit_status: i32,
}

/// A per-item failure kept for the summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Report number, if one had been allocated
    pub sequence: Option<u64>,
    pub identifier: String,
    pub display_name: String,
    pub stage: Stage,
    pub message: String,
    pub exit_status: Option<i32>,
}

/// What a dry run would have executed for one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedInvocation {
    pub sequence: u64,
    pub identifier: String,
    pub display_name: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub profile: ValidationProfile,
    pub command_line: String,
}

/// Run options chosen per invocation
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Process at most this many records from the snapshot
    pub limit: Option<usize>,
    /// First report number
    pub start_sequence: u64,
    /// Plan only; do not invoke the validator or write reports
    pub dry_run: bool,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub state: RunState,
    /// Records in the snapshot, after any limit
    pub total: usize,
    /// Records handled, whatever their outcome
    pub processed: usize,
    pub succeeded: usize,
    pub validation_failures: usize,
    pub errors: usize,
    pub failures: Vec<ItemFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<PlannedInvocation>,
    /// Report number the next run should start from to avoid overwriting
    pub next_sequence: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub abort: Option<AbortReason>,
}

impl RunSummary {
    fn new(start_sequence: u64) -> Self {
        Self {
            state: RunState::Running,
            total: 0,
            processed: 0,
            succeeded: 0,
            validation_failures: 0,
            errors: 0,
            failures: Vec::new(),
            planned: Vec::new(),
            next_sequence: start_sequence,
            started_at: Utc::now(),
            elapsed_ms: 0,
            abort: None,
        }
    }

    /// Items that did not validate cleanly
    pub fn failure_count(&self) -> usize {
        self.validation_failures + self.errors
    }

    pub fn is_aborted(&self) -> bool {
        self.state == RunState::Aborted
    }

    /// One-line outcome
    pub fn headline(&self) -> String {
        match &self.abort {
            Some(reason) => format!(
                "Aborted after {} of {}: {}",
                self.processed, self.total, reason
            ),
            None => format!(
                "Processed {} of {}, {} failure{}",
                self.processed,
                self.total,
                self.failure_count(),
                if self.failure_count() == 1 { "" } else { "s" }
            ),
        }
    }
}

/// A per-item error with the context needed to report it
struct StageFailure {
    stage: Stage,
    error: Error,
    sequence: Option<u64>,
    exit_status: Option<i32>,
}

impl StageFailure {
    fn new(stage: Stage, error: Error) -> Self {
        Self {
            stage,
            error,
            sequence: None,
            exit_status: None,
        }
    }

    fn at(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    fn after_exit(mut self, exit_status: i32) -> Self {
        self.exit_status = Some(exit_status);
        self
    }

    fn abort_reason(&self) -> AbortReason {
        let message = self.error.to_string();
        match &self.error {
            Error::Launch(_) => AbortReason::Launch(message),
            Error::Query(q) if q.stage == QueryStage::RecordSource => {
                AbortReason::RecordSource(message)
            }
            _ => AbortReason::Store(message),
        }
    }
}

enum ItemResult {
    Validated(u64, ValidationOutcome),
    Planned(PlannedInvocation),
}

/// Drives one run over a record snapshot
pub struct RunOrchestrator {
    source: Arc<dyn RecordSource>,
    formats: Arc<dyn FormatLookup>,
    validator: Arc<dyn Validator>,
    writer: ReportWriter,
    asset_root: PathBuf,
    progress: Arc<dyn ProgressProvider>,
    cancel: Arc<AtomicBool>,
    state: RunState,
}

impl RunOrchestrator {
    pub fn new(
        source: Arc<dyn RecordSource>,
        formats: Arc<dyn FormatLookup>,
        validator: Arc<dyn Validator>,
        writer: ReportWriter,
        asset_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            formats,
            validator,
            writer,
            asset_root: asset_root.into(),
            progress: Arc::new(NullProvider),
            cancel: Arc::new(AtomicBool::new(false)),
            state: RunState::Idle,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressProvider>) -> Self {
        self.progress = progress;
        self
    }

    /// Share a flag that stops the run before the next item once set
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute the run and report how it went
    ///
    /// Systemic failures are reported through [`RunSummary::abort`] rather
    /// than as an `Err`, so the caller always gets the counts.
    pub async fn run(&mut self, options: &RunOptions) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::new(options.start_sequence);
        self.state = RunState::Running;

        let outcome = self.run_items(options, &mut summary).await;

        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => {
                summary.state = RunState::Completed;
                info!("{}", summary.headline());
            }
            Err(reason) => {
                summary.state = RunState::Aborted;
                summary.abort = Some(reason);
                error!("{}", summary.headline());
            }
        }
        self.state = summary.state;
        self.progress.report(ProgressUpdate::RunFinished {
            state: summary.state,
            headline: summary.headline(),
        });
        self.progress.complete();
        summary
    }

    async fn run_items(
        &self,
        options: &RunOptions,
        summary: &mut RunSummary,
    ) -> Result<(), AbortReason> {
        let mut records = self.source.fetch_tracked_assets().await.map_err(|e| {
            error!("Cannot fetch tracked assets: {e}");
            AbortReason::RecordSource(e.to_string())
        })?;
        if let Some(limit) = options.limit {
            records.truncate(limit);
        }

        summary.total = records.len();
        self.progress
            .report(ProgressUpdate::RunStarted { total: records.len() });
        if records.is_empty() {
            info!("No tracked assets to validate");
            return Ok(());
        }

        if !options.dry_run {
            self.writer
                .prepare()
                .map_err(|e| AbortReason::OutputDir(e.to_string()))?;
        }

        let mut sequence = OutputSequence::starting_at(options.start_sequence);
        let total = records.len();

        for (index, record) in records.into_iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                warn!("Stopping before {}: interrupted", record.identifier);
                self.progress.report(ProgressUpdate::Status {
                    message: format!(
                        "Interrupted, stopping before {} ({} of {} done)",
                        record.display_name, index, total
                    ),
                });
                return Err(AbortReason::Interrupted);
            }

            self.progress.report(ProgressUpdate::AssetStarted {
                index,
                total,
                identifier: record.identifier.to_string(),
                display_name: record.display_name.clone(),
            });

            let result = self
                .process_item(&record, &mut sequence, options.dry_run)
                .await;
            summary.next_sequence = sequence.peek();

            let (status, output) = match result {
                Ok(ItemResult::Validated(number, outcome)) => {
                    summary.processed += 1;
                    let status = record_outcome(summary, number, &outcome);
                    (status, Some(outcome.report_path))
                }
                Ok(ItemResult::Planned(plan)) => {
                    summary.processed += 1;
                    let output = plan.output.clone();
                    summary.planned.push(plan);
                    (ItemStatus::Planned, Some(output))
                }
                Err(failure) if failure.error.is_fatal() => {
                    error!(
                        "Fatal error at {} ({}) during {}: {}",
                        record.identifier, record.display_name, failure.stage, failure.error
                    );
                    return Err(failure.abort_reason());
                }
                Err(failure) => {
                    summary.processed += 1;
                    summary.errors += 1;
                    warn!(
                        "Skipping {} ({}) after {} failure: {}",
                        record.identifier, record.display_name, failure.stage, failure.error
                    );
                    let status = ItemStatus::Failed {
                        stage: failure.stage,
                    };
                    let output = failure
                        .sequence
                        .map(|n| self.writer.allocate_output_path(n));
                    summary.failures.push(ItemFailure {
                        sequence: failure.sequence,
                        identifier: record.identifier.to_string(),
                        display_name: record.display_name.clone(),
                        stage: failure.stage,
                        message: failure.error.to_string(),
                        exit_status: failure.exit_status,
                    });
                    (status, output)
                }
            };

            self.progress.report(ProgressUpdate::AssetFinished {
                index,
                status,
                output,
            });
        }

        Ok(())
    }

    /// Take one asset through every stage
    async fn process_item(
        &self,
        record: &AssetRecord,
        sequence: &mut OutputSequence,
        dry_run: bool,
    ) -> Result<ItemResult, StageFailure> {
        let input = resolve_location(&self.asset_root, &record.identifier);

        let format = self
            .formats
            .lookup_format(&record.identifier)
            .await
            .map_err(|e| StageFailure::new(Stage::FormatLookup, e))?;
        let profile = ValidationProfile::for_format(format);
        debug!(
            "{} declares format {:?}, validating with {}",
            record.identifier, format, profile
        );

        let number = sequence.advance();
        let output = self.writer.allocate_output_path(number);

        if dry_run {
            return Ok(ItemResult::Planned(PlannedInvocation {
                sequence: number,
                identifier: record.identifier.to_string(),
                display_name: record.display_name.clone(),
                command_line: self.validator.command_line(&profile, &output, &input),
                input,
                output,
                profile,
            }));
        }

        info!("Writing output to: {}", output.display());
        let run = self
            .validator
            .validate(&profile, &output, &input)
            .await
            .map_err(|e| StageFailure::new(Stage::Validate, e).at(number))?;

        if !run.stderr.trim().is_empty() {
            warn!(
                "Validator stderr for {} ({}): {}",
                record.identifier,
                record.display_name,
                run.stderr.trim_end()
            );
        }

        self.writer
            .annotate(&output, &record.display_name)
            .map_err(|e| {
                StageFailure::new(Stage::Annotate, e.into())
                    .at(number)
                    .after_exit(run.exit_status)
            })?;

        Ok(ItemResult::Validated(
            number,
            ValidationOutcome {
                asset: record.clone(),
                report_path: output,
                process_stderr: run.stderr,
                exit_status: run.exit_status,
            },
        ))
    }
}

/// Fold one finished validation into the summary
fn record_outcome(
    summary: &mut RunSummary,
    sequence: u64,
    outcome: &ValidationOutcome,
) -> ItemStatus {
    if outcome.exit_status == 0 {
        summary.succeeded += 1;
        return ItemStatus::Valid;
    }

    summary.validation_failures += 1;
    warn!(
        "Validator reported exit status {} for {} ({})",
        outcome.exit_status, outcome.asset.identifier, outcome.asset.display_name
    );
    summary.failures.push(ItemFailure {
        sequence: Some(sequence),
        identifier: outcome.asset.identifier.to_string(),
        display_name: outcome.asset.display_name.clone(),
        stage: Stage::Validate,
        message: format!("validator exited with status {}", outcome.exit_status),
        exit_status: Some(outcome.exit_status),
    });
    ItemStatus::ValidationFailure {
        exit_status: outcome.exit_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headline_for_completed_run() {
        let mut summary = RunSummary::new(0);
        summary.total = 3;
        summary.processed = 3;
        summary.succeeded = 2;
        summary.errors = 1;
        assert_eq!(summary.headline(), "Processed 3 of 3, 1 failure");

        summary.validation_failures = 1;
        assert_eq!(summary.headline(), "Processed 3 of 3, 2 failures");
    }

    #[test]
    fn test_headline_for_aborted_run() {
        let mut summary = RunSummary::new(0);
        summary.total = 10;
        summary.processed = 4;
        summary.abort = Some(AbortReason::Interrupted);
        assert_eq!(summary.headline(), "Aborted after 4 of 10: interrupted");
    }

    #[test]
    fn test_abort_reason_serializes_tagged() {
        let json = serde_json::to_value(AbortReason::Launch("missing".to_string())).unwrap();
        assert_eq!(json["reason"], "launch");
        assert_eq!(json["message"], "missing");
    }

    #[test]
    fn test_item_status_serializes_tagged() {
        let json = serde_json::to_value(ItemStatus::ValidationFailure { exit_status: 2 }).unwrap();
        assert_eq!(json["status"], "validation_failure");
        assert_eq!(json["exit_status"], 2);
    }
}
