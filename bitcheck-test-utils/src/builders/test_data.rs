//! Builders for test collections

use crate::mocks::{MockFormatLookup, MockRecordSource};
use bitcheck_core::AssetRecord;

/// Builds a collection snapshot together with its format table
#[derive(Debug, Default)]
pub struct CollectionBuilder {
    records: Vec<AssetRecord>,
    lookup: MockFormatLookup,
}

impl CollectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset with no declared format
    pub fn asset(mut self, identifier: &str, display_name: &str) -> Self {
        self.records.push(AssetRecord::new(identifier, display_name));
        self
    }

    /// Add an asset with a declared format code
    pub fn asset_with_format(mut self, identifier: &str, display_name: &str, code: i64) -> Self {
        self.records.push(AssetRecord::new(identifier, display_name));
        self.lookup = self.lookup.with_format(identifier, code);
        self
    }

    /// Add `count` assets named `asset-<n>.bin` with numeric identifiers
    pub fn numbered(mut self, count: usize) -> Self {
        let first = self.records.len();
        for n in first..first + count {
            self.records
                .push(AssetRecord::new(sample_identifier(n), format!("asset-{n}.bin")));
        }
        self
    }

    /// Replace the format table, keeping the records
    pub fn with_lookup(mut self, lookup: MockFormatLookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }

    pub fn build(self) -> (MockRecordSource, MockFormatLookup) {
        (MockRecordSource::new(self.records), self.lookup)
    }
}

/// A long numeric identifier shaped like the ones the asset store assigns
pub fn sample_identifier(n: usize) -> String {
    format!("{:038}", 10_000_000_000u64 + n as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_identifiers_are_unique() {
        let builder = CollectionBuilder::new().numbered(5);
        let mut ids: Vec<_> = builder
            .records()
            .iter()
            .map(|r| r.identifier.to_string())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
        assert!(ids.iter().all(|id| id.len() == 38));
    }

    #[tokio::test]
    async fn test_asset_with_format_registers_code() {
        use bitcheck_core::{FormatCode, FormatLookup};

        let (_source, lookup) = CollectionBuilder::new()
            .asset_with_format("abc123", "scan.tif", 15)
            .asset("def456", "notes.txt")
            .build();

        let code = lookup.lookup_format(&"abc123".into()).await.unwrap();
        assert_eq!(code, Some(FormatCode(15)));
        assert_eq!(lookup.lookup_format(&"def456".into()).await.unwrap(), None);
    }
}
