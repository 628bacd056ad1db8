//! Metadata store access through sqlx
//!
//! The repository database is PostgreSQL in production. The same queries run
//! against SQLite in tests through sqlx's `Any` driver, so nothing here is
//! specific to one backend.

pub mod queries;

use crate::config::StoreConfig;
use crate::error::{QueryError, QueryStage};
use crate::model::{AssetIdentifier, AssetRecord, FormatCode};
use crate::source::{FormatLookup, RecordSource};
use crate::Result;
use async_trait::async_trait;
use log::{debug, trace, warn};
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

/// Read-only handle on the repository's metadata store
pub struct MetadataStore {
    pool: AnyPool,
    collection_id: i64,
}

impl MetadataStore {
    /// Connect to the store described by `config`
    ///
    /// Fails with a `Connect`-stage [`QueryError`] if the store is unreachable.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        sqlx::any::install_default_drivers();

        debug!(
            "Connecting to metadata store (collection {}, max {} connections)",
            config.collection_id, config.max_connections
        );
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .connect(&config.url)
            .await
            .map_err(|e| QueryError::from_sqlx(QueryStage::Connect, e))?;

        Ok(Self::from_pool(pool, config.collection_id))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: AnyPool, collection_id: i64) -> Self {
        Self {
            pool,
            collection_id,
        }
    }

    pub fn collection_id(&self) -> i64 {
        self.collection_id
    }

    /// Close all connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RecordSource for MetadataStore {
    async fn fetch_tracked_assets(&self) -> Result<Vec<AssetRecord>> {
        let rows = sqlx::query(queries::TRACKED_ASSETS)
            .bind(self.collection_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| QueryError::from_sqlx(QueryStage::RecordSource, e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match queries::asset_from_row(row)
                .map_err(|e| QueryError::from_sqlx(QueryStage::RecordSource, e))?
            {
                Some(record) => {
                    if record.identifier.as_str().is_empty() {
                        warn!(
                            "Bitstream {:?} has an empty internal id; its validation will fail",
                            record.display_name
                        );
                    }
                    records.push(record);
                }
                None => trace!("Skipping collection row without a bitstream"),
            }
        }

        debug!(
            "Collection {} tracks {} asset(s) ({} row(s) returned)",
            self.collection_id,
            records.len(),
            rows.len()
        );
        Ok(records)
    }
}

#[async_trait]
impl FormatLookup for MetadataStore {
    async fn lookup_format(&self, identifier: &AssetIdentifier) -> Result<Option<FormatCode>> {
        let row = sqlx::query(queries::FORMAT_BY_IDENTIFIER)
            .bind(identifier.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| QueryError::from_sqlx(QueryStage::FormatLookup, e))?;

        let code = match row {
            Some(row) => queries::format_from_row(&row)
                .map_err(|e| QueryError::from_sqlx(QueryStage::FormatLookup, e))?,
            None => None,
        };

        trace!("Format for {identifier}: {code:?}");
        Ok(code)
    }
}
