//! In-memory metadata store doubles

use async_trait::async_trait;
use bitcheck_core::error::{QueryError, QueryErrorKind, QueryStage};
use bitcheck_core::{AssetIdentifier, AssetRecord, FormatCode, FormatLookup, RecordSource, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A store failure to inject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    Unavailable,
    Rejected,
    Malformed,
}

impl StoreFailure {
    fn into_error(self, stage: QueryStage, subject: &str) -> QueryError {
        let kind = match self {
            StoreFailure::Unavailable => QueryErrorKind::Unavailable,
            StoreFailure::Rejected => QueryErrorKind::Rejected,
            StoreFailure::Malformed => QueryErrorKind::Malformed,
        };
        QueryError::new(stage, kind, format!("injected failure for {subject}"))
    }
}

/// Record source that returns a fixed snapshot, or fails
#[derive(Debug, Clone, Default)]
pub struct MockRecordSource {
    records: Vec<AssetRecord>,
    failure: Option<StoreFailure>,
    fetches: Arc<AtomicUsize>,
}

impl MockRecordSource {
    pub fn new(records: Vec<AssetRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// A source whose every fetch fails
    pub fn failing(failure: StoreFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    /// How many times the snapshot was requested
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for MockRecordSource {
    async fn fetch_tracked_assets(&self) -> Result<Vec<AssetRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(failure) => Err(failure
                .into_error(QueryStage::RecordSource, "collection")
                .into()),
            None => Ok(self.records.clone()),
        }
    }
}

/// Format lookup backed by a map, with per-identifier failures
#[derive(Debug, Clone, Default)]
pub struct MockFormatLookup {
    formats: HashMap<String, FormatCode>,
    failures: HashMap<String, StoreFailure>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl MockFormatLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, identifier: &str, code: i64) -> Self {
        self.formats.insert(identifier.to_string(), FormatCode(code));
        self
    }

    /// Fail every lookup of `identifier`
    pub fn with_failure(mut self, identifier: &str, failure: StoreFailure) -> Self {
        self.failures.insert(identifier.to_string(), failure);
        self
    }

    /// Identifiers looked up so far, in order
    pub fn lookups(&self) -> Vec<String> {
        self.lookups
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl FormatLookup for MockFormatLookup {
    async fn lookup_format(&self, identifier: &AssetIdentifier) -> Result<Option<FormatCode>> {
        if let Ok(mut guard) = self.lookups.lock() {
            guard.push(identifier.to_string());
        }
        if let Some(failure) = self.failures.get(identifier.as_str()) {
            return Err(failure
                .into_error(QueryStage::FormatLookup, identifier.as_str())
                .into());
        }
        Ok(self.formats.get(identifier.as_str()).copied())
    }
}
