//! Validator launch failures

use std::path::{Path, PathBuf};
use thiserror::Error;

/// The validator executable could not be started at all
///
/// This is a misconfiguration of the host, not a property of any asset,
/// so the orchestrator stops the run when it sees one.
#[derive(Error, Debug)]
#[error("Cannot launch validator '{}': {source}", .executable.display())]
pub struct LaunchError {
    pub executable: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl LaunchError {
    pub fn new(executable: &Path, source: std::io::Error) -> Self {
        Self {
            executable: executable.to_path_buf(),
            source,
        }
    }
}
