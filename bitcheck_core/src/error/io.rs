//! Filesystem error types not tied to a specific report

use std::path::{Path, PathBuf};
use thiserror::Error;

/// I/O error with the path it happened on
#[derive(Error, Debug)]
#[error("{}", describe(self))]
pub struct IoError {
    /// The kind of I/O error
    pub kind: IoErrorKind,
    /// Path associated with the error (if any)
    pub path: Option<PathBuf>,
    /// Underlying I/O error (if any)
    #[source]
    pub source: Option<std::io::Error>,
}

/// Kind of I/O error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoErrorKind {
    NotFound,
    PermissionDenied,
    Other,
}

impl IoError {
    /// Create an I/O error from a standard I/O error
    pub fn from_std(source: std::io::Error) -> Self {
        let kind = match source.kind() {
            std::io::ErrorKind::NotFound => IoErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => IoErrorKind::PermissionDenied,
            _ => IoErrorKind::Other,
        };

        Self {
            kind,
            path: None,
            source: Some(source),
        }
    }

    /// Attach the path the error happened on
    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.to_path_buf());
        self
    }
}

fn describe(error: &IoError) -> String {
    let what = match error.kind {
        IoErrorKind::NotFound => "Not found",
        IoErrorKind::PermissionDenied => "Permission denied",
        IoErrorKind::Other => "I/O error",
    };

    match (&error.path, &error.source) {
        (Some(path), Some(source)) => format!("{what}: {} ({source})", path.display()),
        (Some(path), None) => format!("{what}: {}", path.display()),
        (None, Some(source)) => format!("{what}: {source}"),
        (None, None) => what.to_string(),
    }
}
