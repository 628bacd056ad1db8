//! Test data builders

mod test_data;

pub use test_data::{CollectionBuilder, sample_identifier};
