//! Progress reporting abstractions
//!
//! The orchestrator reports what it is doing through a [`ProgressProvider`]
//! without knowing whether anything renders it.

use crate::run::{ItemStatus, RunState};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Core trait for progress reporting
pub trait ProgressProvider: Send + Sync {
    /// Report a progress update
    fn report(&self, update: ProgressUpdate);

    /// Signal that the run is over
    fn complete(&self);
}

/// Progress events emitted during a run
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    /// The record snapshot has been fetched
    RunStarted { total: usize },

    /// An asset is about to be validated
    AssetStarted {
        index: usize,
        total: usize,
        identifier: String,
        display_name: String,
    },

    /// An asset has been fully handled
    AssetFinished {
        index: usize,
        status: ItemStatus,
        /// Report path, once one was allocated
        output: Option<PathBuf>,
    },

    /// Generic status message
    Status { message: String },

    /// The run has ended, either completed or aborted
    RunFinished { state: RunState, headline: String },
}

/// Null implementation for when no progress is needed
pub struct NullProvider;

impl ProgressProvider for NullProvider {
    fn report(&self, _update: ProgressUpdate) {}

    fn complete(&self) {}
}

/// Keeps every update in memory
#[derive(Default, Clone)]
pub struct RecordingProvider {
    updates: Arc<Mutex<Vec<ProgressUpdate>>>,
    completed: Arc<Mutex<bool>>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the updates seen so far
    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn is_complete(&self) -> bool {
        self.completed.lock().map(|guard| *guard).unwrap_or(false)
    }
}

impl ProgressProvider for RecordingProvider {
    fn report(&self, update: ProgressUpdate) {
        if let Ok(mut guard) = self.updates.lock() {
            guard.push(update);
        }
    }

    fn complete(&self) {
        if let Ok(mut guard) = self.completed.lock() {
            *guard = true;
        }
    }
}
