//! Run orchestration tests
//!
//! Every scenario drives the real orchestrator and report writer with
//! in-memory doubles for the store and the validator.

use bitcheck_core::progress::RecordingProvider;
use bitcheck_core::{
    AbortReason, ItemStatus, ProgressUpdate, ReportWriter, RunOptions, RunOrchestrator, RunState,
    RunSummary, Stage, ValidationMode,
};
use bitcheck_test_utils::{
    CollectionBuilder, MockFormatLookup, MockRecordSource, MockValidator, StoreFailure,
    ValidatorBehavior,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;

const FIRST: &str = "1182736450192837465";
const SECOND: &str = "2293847561029384756";
const THIRD: &str = "3304958672130495867";

struct Harness {
    temp: TempDir,
    validator: MockValidator,
    progress: RecordingProvider,
    cancel: Arc<AtomicBool>,
}

impl Harness {
    fn new(validator: MockValidator) -> Self {
        Self {
            temp: TempDir::new().unwrap(),
            validator,
            progress: RecordingProvider::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    fn output_dir(&self) -> PathBuf {
        self.temp.path().join("reports")
    }

    fn asset_root(&self) -> PathBuf {
        self.temp.path().join("assetstore")
    }

    fn report(&self, sequence: u64) -> PathBuf {
        self.output_dir().join(sequence.to_string())
    }

    async fn run(
        &self,
        source: MockRecordSource,
        lookup: MockFormatLookup,
        options: RunOptions,
    ) -> RunSummary {
        let mut orchestrator = RunOrchestrator::new(
            Arc::new(source),
            Arc::new(lookup),
            Arc::new(self.validator.clone()),
            ReportWriter::new(self.output_dir()),
            self.asset_root(),
        )
        .with_progress(Arc::new(self.progress.clone()))
        .with_cancel_flag(self.cancel.clone());

        assert_eq!(orchestrator.state(), RunState::Idle);
        let summary = orchestrator.run(&options).await;
        assert_eq!(orchestrator.state(), summary.state);
        summary
    }
}

fn three_assets() -> CollectionBuilder {
    CollectionBuilder::new()
        .asset_with_format(FIRST, "thesis.pdf", 3)
        .asset(SECOND, "data.csv")
        .asset_with_format(THIRD, "scan.tif", 15)
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn test_write_failure_is_isolated_to_its_item() {
    let validator = MockValidator::new().on(
        SECOND,
        ValidatorBehavior::NoReport {
            exit_status: 0,
            stderr: String::new(),
        },
    );
    let harness = Harness::new(validator);
    let (source, lookup) = three_assets().build();

    let summary = harness.run(source, lookup, RunOptions::default()).await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.failure_count(), 1);

    let failure = &summary.failures[0];
    assert_eq!(failure.identifier, SECOND);
    assert_eq!(failure.display_name, "data.csv");
    assert_eq!(failure.stage, Stage::Annotate);
    assert_eq!(failure.sequence, Some(1));

    assert!(read(&harness.report(0)).starts_with("File Name: thesis.pdf\n"));
    assert!(!harness.report(1).exists());
    assert!(read(&harness.report(2)).starts_with("File Name: scan.tif\n"));
    assert!(harness.progress.is_complete());
}

#[tokio::test]
async fn test_record_source_failure_aborts_before_any_item() {
    let harness = Harness::new(MockValidator::new());

    let summary = harness
        .run(
            MockRecordSource::failing(StoreFailure::Unavailable),
            MockFormatLookup::new(),
            RunOptions::default(),
        )
        .await;

    assert_eq!(summary.state, RunState::Aborted);
    assert!(matches!(summary.abort, Some(AbortReason::RecordSource(_))));
    assert_eq!(summary.processed, 0);
    assert!(harness.validator.calls().is_empty());
    assert!(!harness.output_dir().exists());
}

#[tokio::test]
async fn test_launch_failure_aborts_the_run() {
    let validator = MockValidator::new().on(SECOND, ValidatorBehavior::LaunchFailure);
    let harness = Harness::new(validator);
    let (source, lookup) = three_assets().build();

    let summary = harness.run(source, lookup, RunOptions::default()).await;

    assert!(summary.is_aborted());
    assert!(matches!(summary.abort, Some(AbortReason::Launch(_))));
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.succeeded, 1);
    // The third asset is never attempted
    assert_eq!(harness.validator.calls().len(), 2);
    assert!(summary.headline().starts_with("Aborted after 1 of 3"));
}

#[tokio::test]
async fn test_timeout_is_isolated_to_its_item() {
    let validator = MockValidator::new().on(FIRST, ValidatorBehavior::Timeout);
    let harness = Harness::new(validator);
    let (source, lookup) = three_assets().build();

    let summary = harness.run(source, lookup, RunOptions::default()).await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failures[0].stage, Stage::Validate);
    assert_eq!(summary.failures[0].identifier, FIRST);
}

#[tokio::test]
async fn test_non_zero_exit_is_a_validation_failure() {
    let validator = MockValidator::new().on(
        THIRD,
        ValidatorBehavior::Report {
            content: "Status: Not well-formed\n".to_string(),
            exit_status: 1,
            stderr: "TIFF header damaged".to_string(),
        },
    );
    let harness = Harness::new(validator);
    let (source, lookup) = three_assets().build();

    let summary = harness.run(source, lookup, RunOptions::default()).await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.validation_failures, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.failures[0].exit_status, Some(1));
    assert_eq!(summary.failures[0].sequence, Some(2));
    // The report is still labelled
    assert_eq!(
        read(&harness.report(2)),
        "File Name: scan.tif\nStatus: Not well-formed\n"
    );
}

#[tokio::test]
async fn test_non_zero_exit_without_report_is_an_error() {
    let validator = MockValidator::new().on(
        FIRST,
        ValidatorBehavior::NoReport {
            exit_status: 2,
            stderr: "cannot open input".to_string(),
        },
    );
    let harness = Harness::new(validator);
    let (source, lookup) = three_assets().build();

    let summary = harness.run(source, lookup, RunOptions::default()).await;

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.validation_failures, 0);
    let failure = &summary.failures[0];
    assert_eq!(failure.stage, Stage::Annotate);
    assert_eq!(failure.exit_status, Some(2));
}

#[tokio::test]
async fn test_empty_collection_completes() {
    let harness = Harness::new(MockValidator::new());

    let summary = harness
        .run(
            MockRecordSource::new(Vec::new()),
            MockFormatLookup::new(),
            RunOptions::default(),
        )
        .await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.total, 0);
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.headline(), "Processed 0 of 0, 0 failures");
}

#[tokio::test]
async fn test_cancellation_stops_between_items() {
    let cancel = Arc::new(AtomicBool::new(false));
    let validator = MockValidator::new().cancel_after(1, cancel.clone());
    let mut harness = Harness::new(validator);
    harness.cancel = cancel;
    let (source, lookup) = three_assets().build();

    let summary = harness.run(source, lookup, RunOptions::default()).await;

    assert_eq!(summary.state, RunState::Aborted);
    assert_eq!(summary.abort, Some(AbortReason::Interrupted));
    // The in-flight item is finished, including its annotation
    assert_eq!(summary.processed, 1);
    assert!(read(&harness.report(0)).starts_with("File Name: thesis.pdf\n"));
    assert!(!harness.report(1).exists());
    assert_eq!(summary.next_sequence, 1);
}

#[tokio::test]
async fn test_limit_and_start_sequence() {
    let harness = Harness::new(MockValidator::new());
    let (source, lookup) = three_assets().build();
    let options = RunOptions {
        limit: Some(2),
        start_sequence: 10,
        dry_run: false,
    };

    let summary = harness.run(source, lookup, options).await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.processed, 2);
    assert!(harness.report(10).exists());
    assert!(harness.report(11).exists());
    assert!(!harness.report(12).exists());
    assert_eq!(summary.next_sequence, 12);
}

#[tokio::test]
async fn test_dry_run_plans_without_executing() {
    let harness = Harness::new(MockValidator::new());
    let (source, lookup) = three_assets().build();
    let options = RunOptions {
        dry_run: true,
        ..RunOptions::default()
    };

    let summary = harness.run(source, lookup, options).await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.succeeded, 0);
    assert!(harness.validator.calls().is_empty());
    assert!(!harness.output_dir().exists());

    assert_eq!(summary.planned.len(), 3);
    let first = &summary.planned[0];
    assert_eq!(first.sequence, 0);
    assert_eq!(first.profile.mode, Some(ValidationMode::Pdf));
    assert!(first.command_line.contains("-m pdf-hul -o"));
    assert!(summary.planned[1].profile.is_auto_detect());
    assert_eq!(summary.planned[2].output, harness.report(2));
}

#[tokio::test]
async fn test_malformed_format_row_skips_item_without_consuming_sequence() {
    let harness = Harness::new(MockValidator::new());
    let lookup = MockFormatLookup::new()
        .with_failure(FIRST, StoreFailure::Malformed)
        .with_format(SECOND, 4);
    let (source, lookup) = CollectionBuilder::new()
        .asset(FIRST, "broken.bin")
        .asset(SECOND, "record.xml")
        .with_lookup(lookup)
        .build();

    let summary = harness.run(source, lookup, RunOptions::default()).await;

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.failures[0].stage, Stage::FormatLookup);
    assert_eq!(summary.failures[0].sequence, None);
    // The next asset takes the first report number
    assert_eq!(read(&harness.report(0)), "File Name: record.xml\nStatus: Well-Formed and valid\n");
}

#[tokio::test]
async fn test_store_outage_during_lookup_aborts() {
    let harness = Harness::new(MockValidator::new());
    let lookup = MockFormatLookup::new().with_failure(SECOND, StoreFailure::Unavailable);
    let (source, lookup) = three_assets().with_lookup(lookup).build();

    let summary = harness.run(source, lookup, RunOptions::default()).await;

    assert!(matches!(summary.abort, Some(AbortReason::Store(_))));
    assert_eq!(summary.processed, 1);
}

#[tokio::test]
async fn test_validator_receives_resolved_paths_and_profile() {
    let harness = Harness::new(MockValidator::new());
    let (source, lookup) = three_assets().build();

    harness.run(source, lookup, RunOptions::default()).await;

    let calls = harness.validator.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(
        calls[0].input,
        harness.asset_root().join("11").join("82").join("73").join(FIRST)
    );
    assert_eq!(calls[0].output, harness.report(0));
    assert_eq!(calls[0].profile.tool_args, vec!["-m", "pdf-hul"]);
    assert!(calls[1].profile.tool_args.is_empty());
    assert_eq!(calls[2].profile.mode, Some(ValidationMode::Tiff));
}

#[tokio::test]
async fn test_reports_are_numbered_in_record_order() {
    let harness = Harness::new(MockValidator::new());
    let (source, lookup) = CollectionBuilder::new().numbered(5).build();

    let summary = harness.run(source, lookup, RunOptions::default()).await;

    assert_eq!(summary.succeeded, 5);
    for n in 0..5u64 {
        assert!(read(&harness.report(n)).starts_with(&format!("File Name: asset-{n}.bin\n")));
    }
}

#[tokio::test]
async fn test_progress_events() {
    let validator = MockValidator::new().on(
        SECOND,
        ValidatorBehavior::Report {
            content: "x".to_string(),
            exit_status: 4,
            stderr: String::new(),
        },
    );
    let harness = Harness::new(validator);
    let (source, lookup) = CollectionBuilder::new()
        .asset(FIRST, "a.pdf")
        .asset(SECOND, "b.pdf")
        .build();

    harness.run(source, lookup, RunOptions::default()).await;

    let updates = harness.progress.updates();
    assert_eq!(updates[0], ProgressUpdate::RunStarted { total: 2 });
    assert_eq!(
        updates[1],
        ProgressUpdate::AssetStarted {
            index: 0,
            total: 2,
            identifier: FIRST.to_string(),
            display_name: "a.pdf".to_string(),
        }
    );
    assert_eq!(
        updates[2],
        ProgressUpdate::AssetFinished {
            index: 0,
            status: ItemStatus::Valid,
            output: Some(harness.report(0)),
        }
    );
    assert_eq!(
        updates[4],
        ProgressUpdate::AssetFinished {
            index: 1,
            status: ItemStatus::ValidationFailure { exit_status: 4 },
            output: Some(harness.report(1)),
        }
    );
    assert_eq!(
        updates[5],
        ProgressUpdate::RunFinished {
            state: RunState::Completed,
            headline: "Processed 2 of 2, 1 failure".to_string(),
        }
    );
    assert_eq!(updates.len(), 6);
}

#[tokio::test]
async fn test_interrupted_run_reports_abort_to_progress() {
    let cancel = Arc::new(AtomicBool::new(false));
    let validator = MockValidator::new().cancel_after(1, cancel.clone());
    let mut harness = Harness::new(validator);
    harness.cancel = cancel;
    let (source, lookup) = three_assets().build();

    harness.run(source, lookup, RunOptions::default()).await;

    let updates = harness.progress.updates();
    let status = updates
        .iter()
        .find_map(|u| match u {
            ProgressUpdate::Status { message } => Some(message.clone()),
            _ => None,
        })
        .expect("interrupt status");
    assert!(status.contains("stopping before data.csv"));
    assert!(status.contains("1 of 3 done"));
    match updates.last() {
        Some(ProgressUpdate::RunFinished { state, headline }) => {
            assert_eq!(*state, RunState::Aborted);
            assert_eq!(headline, "Aborted after 1 of 3: interrupted");
        }
        other => panic!("expected run finished last, got {other:?}"),
    }
    assert!(harness.progress.is_complete());
}

#[tokio::test]
async fn test_unusable_output_dir_aborts() {
    let harness = Harness::new(MockValidator::new());
    // A file where the output directory should be
    std::fs::write(harness.output_dir(), "not a directory").unwrap();
    let (source, lookup) = three_assets().build();

    let summary = harness.run(source, lookup, RunOptions::default()).await;

    assert!(matches!(summary.abort, Some(AbortReason::OutputDir(_))));
    assert_eq!(summary.processed, 0);
    assert!(harness.validator.calls().is_empty());
}

#[tokio::test]
async fn test_summary_serializes_for_json_output() {
    let harness = Harness::new(MockValidator::new().on(SECOND, ValidatorBehavior::Timeout));
    let (source, lookup) = three_assets().build();

    let summary = harness.run(source, lookup, RunOptions::default()).await;
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["state"], "completed");
    assert_eq!(json["succeeded"], 2);
    assert_eq!(json["failures"][0]["stage"], "validate");
    assert_eq!(json["failures"][0]["identifier"], SECOND);
    assert!(json["abort"].is_null());
    assert!(json.get("planned").is_none());
}
