//! Mock implementations for testing

mod source;
mod validator;

pub use source::{MockFormatLookup, MockRecordSource, StoreFailure};
pub use validator::{MockValidator, ValidatorBehavior, ValidatorCall};
