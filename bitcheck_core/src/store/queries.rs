//! SQL statements and row decoding
//!
//! Rows are decoded by column name into model types here, so the rest of
//! the pipeline never sees raw result sets.

use crate::model::{AssetRecord, FormatCode};
use sqlx::Row;
use sqlx::any::AnyRow;

/// Bitstreams reachable from one collection, `$1` = collection id
///
/// Left joins keep items without bitstreams in the result; those rows carry a
/// NULL `internal_id` and are dropped by [`asset_from_row`].
pub const TRACKED_ASSETS: &str = r#"
    SELECT b.internal_id AS internal_id, b.name AS name
    FROM collection2item cti
    LEFT JOIN item2bundle itb ON cti.item_id = itb.item_id
    LEFT JOIN bundle2bitstream btb ON btb.bundle_id = itb.bundle_id
    LEFT JOIN bitstream b ON btb.bitstream_id = b.bitstream_id
    WHERE cti.collection_id = $1
    ORDER BY b.bitstream_id
"#;

/// Declared format of one bitstream, `$1` = internal id
pub const FORMAT_BY_IDENTIFIER: &str = r#"
    SELECT CAST(bitstream_format_id AS BIGINT) AS bitstream_format_id
    FROM bitstream
    WHERE internal_id = $1
    LIMIT 1
"#;

/// Decode one row of [`TRACKED_ASSETS`]
///
/// Returns `Ok(None)` for rows with no bitstream. A missing name becomes an
/// empty display name. An empty identifier is still a bitstream and is kept.
pub fn asset_from_row(row: &AnyRow) -> Result<Option<AssetRecord>, sqlx::Error> {
    let identifier: Option<String> = row.try_get("internal_id")?;
    let name: Option<String> = row.try_get("name")?;

    Ok(identifier.map(|id| AssetRecord::new(id, name.unwrap_or_default())))
}

/// Decode one row of [`FORMAT_BY_IDENTIFIER`]
pub fn format_from_row(row: &AnyRow) -> Result<Option<FormatCode>, sqlx::Error> {
    let code: Option<i64> = row.try_get("bitstream_format_id")?;
    Ok(code.map(FormatCode))
}
