//! Read-side seams onto the metadata store
//!
//! The pipeline only ever asks two questions of the store: which assets are
//! tracked, and what format each one declares. Both are traits so that the
//! orchestrator can be driven by the sqlx-backed store in production and by
//! in-memory doubles in tests.

use crate::Result;
use crate::model::{AssetIdentifier, AssetRecord, FormatCode};
use async_trait::async_trait;

/// Enumerates the assets a run should process
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the full snapshot of tracked assets
    ///
    /// An empty vector is a valid answer. Any error is fatal for the run;
    /// there is no notion of a partial snapshot.
    async fn fetch_tracked_assets(&self) -> Result<Vec<AssetRecord>>;
}

/// Resolves an asset's declared format
#[async_trait]
pub trait FormatLookup: Send + Sync {
    /// `Ok(None)` when the store has no format for this identifier
    async fn lookup_format(&self, identifier: &AssetIdentifier) -> Result<Option<FormatCode>>;
}
