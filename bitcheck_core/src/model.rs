//! Asset data model shared by every pipeline stage

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a tracked asset
///
/// Used both as the metadata-store key and, through [`crate::paths`], as the
/// on-disk locator of the asset's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetIdentifier(String);

impl AssetIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetIdentifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One row produced by the record source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub identifier: AssetIdentifier,
    pub display_name: String,
}

impl AssetRecord {
    pub fn new(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identifier: AssetIdentifier::new(identifier),
            display_name: display_name.into(),
        }
    }
}

/// Declared content type of an asset, as recorded in the metadata store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatCode(pub i64);

impl fmt::Display for FormatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
