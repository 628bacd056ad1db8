//! Report writing failures

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A report could not be created or annotated
#[derive(Error, Debug)]
pub enum WriteError {
    /// The validator exited without leaving a report behind
    #[error("Validator produced no report at {}", .path.display())]
    MissingReport { path: PathBuf },

    /// The output directory could not be created
    #[error("Cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or rewriting the report failed; the original is left in place
    #[error("Cannot annotate report {}: {source}", .path.display())]
    Annotate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WriteError {
    pub fn missing_report(path: &Path) -> Self {
        Self::MissingReport {
            path: path.to_path_buf(),
        }
    }

    pub fn output_dir(path: &Path, source: std::io::Error) -> Self {
        Self::OutputDir {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn annotate(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::missing_report(path);
        }
        Self::Annotate {
            path: path.to_path_buf(),
            source,
        }
    }
}
