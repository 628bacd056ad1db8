//! bitcheck core library
//!
//! Batch format validation for repository bitstreams: enumerate the assets a
//! collection tracks, find each one in the sharded asset store, pick a
//! validator module from its declared format, run the external validator and
//! label the report it leaves behind.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod model;
pub mod paths;
pub mod progress;
pub mod report;
pub mod run;
pub mod source;
#[cfg(feature = "database")]
pub mod store;

// Re-export main types
pub use config::{PipelineConfig, StorageConfig, StoreConfig, ValidatorConfig};
pub use dispatcher::{ProcessValidator, Validator, ValidatorRun};
pub use error::{Error, Result};
pub use format::{ValidationMode, ValidationProfile};
pub use model::{AssetIdentifier, AssetRecord, FormatCode};
pub use paths::resolve_location;
pub use progress::{NullProvider, ProgressProvider, ProgressUpdate, RecordingProvider};
pub use report::{OutputSequence, ReportWriter};
pub use run::{
    AbortReason, ItemFailure, ItemStatus, PlannedInvocation, RunOptions, RunOrchestrator,
    RunState, RunSummary, Stage, ValidationOutcome,
};
pub use source::{FormatLookup, RecordSource};
#[cfg(feature = "database")]
pub use store::MetadataStore;
