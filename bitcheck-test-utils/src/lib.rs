//! Test utilities for bitcheck
//!
//! In-memory doubles for the record source, the format lookup and the
//! validator, plus builders for collections of assets.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::CollectionBuilder;
pub use mocks::{
    MockFormatLookup, MockRecordSource, MockValidator, StoreFailure, ValidatorBehavior,
    ValidatorCall,
};
