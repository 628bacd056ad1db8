//! Error types for the bitcheck core library
//!
//! Errors fall into two groups. Systemic errors (the metadata store cannot be
//! reached, the validator cannot be started) end the run. Per-item errors
//! (a report cannot be written, one invocation hangs, one row is malformed)
//! are recorded against the asset and the run moves on. [`Error::is_fatal`]
//! is the single place that draws that line.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub mod config;
pub mod io;
pub mod launch;
pub mod query;
pub mod write;

pub use self::config::ConfigError;
pub use self::io::{IoError, IoErrorKind};
pub use self::launch::LaunchError;
pub use self::query::{QueryError, QueryErrorKind, QueryStage};
pub use self::write::WriteError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the bitcheck core library
#[derive(Error, Debug)]
pub enum Error {
    /// Metadata store errors
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The validator executable could not be started
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// A report could not be created or annotated
    #[error(transparent)]
    Write(#[from] WriteError),

    /// The validator did not finish within the configured limit
    #[error("Validator timed out after {}s on {}", .after.as_secs(), .input.display())]
    Timeout { input: PathBuf, after: Duration },

    /// Other filesystem errors
    #[error(transparent)]
    Io(#[from] IoError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Create a timeout error for an input path
    pub fn timeout(input: &std::path::Path, after: Duration) -> Self {
        Self::Timeout {
            input: input.to_path_buf(),
            after,
        }
    }

    /// Whether this error must end the whole run
    ///
    /// Store outages and launch failures are systemic. A malformed row only
    /// concerns the asset it belongs to.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Launch(_) | Error::Config(_) => true,
            Error::Query(err) => err.kind != QueryErrorKind::Malformed,
            Error::Write(_) | Error::Timeout { .. } | Error::Io(_) => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io(IoError::from_std(source))
    }
}
