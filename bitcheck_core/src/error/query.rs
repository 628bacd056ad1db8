//! Metadata store error types

use std::fmt;
use thiserror::Error;

/// Which query was running when the store failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStage {
    /// Opening the connection pool
    Connect,
    /// Enumerating tracked assets
    RecordSource,
    /// Looking up one asset's declared format
    FormatLookup,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueryStage::Connect => "connect",
            QueryStage::RecordSource => "record source",
            QueryStage::FormatLookup => "format lookup",
        })
    }
}

/// How the store failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// The store could not be reached or the pool is exhausted
    Unavailable,
    /// The store rejected the statement
    Rejected,
    /// A row came back in a shape we cannot decode
    Malformed,
}

/// Metadata store query failure
#[derive(Error, Debug)]
#[error("Metadata store {} during {stage}: {message}", kind_label(.kind))]
pub struct QueryError {
    pub stage: QueryStage,
    pub kind: QueryErrorKind,
    pub message: String,
}

fn kind_label(kind: &QueryErrorKind) -> &'static str {
    match kind {
        QueryErrorKind::Unavailable => "unavailable",
        QueryErrorKind::Rejected => "rejected query",
        QueryErrorKind::Malformed => "returned a malformed row",
    }
}

impl QueryError {
    pub fn new(stage: QueryStage, kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(stage: QueryStage, message: impl Into<String>) -> Self {
        Self::new(stage, QueryErrorKind::Unavailable, message)
    }

    pub fn rejected(stage: QueryStage, message: impl Into<String>) -> Self {
        Self::new(stage, QueryErrorKind::Rejected, message)
    }

    pub fn malformed(stage: QueryStage, message: impl Into<String>) -> Self {
        Self::new(stage, QueryErrorKind::Malformed, message)
    }

    /// Classify a driver error raised while running `stage`
    #[cfg(feature = "database")]
    pub fn from_sqlx(stage: QueryStage, err: sqlx::Error) -> Self {
        use sqlx::Error as E;

        let kind = match &err {
            E::Database(_) => QueryErrorKind::Rejected,
            E::ColumnDecode { .. }
            | E::ColumnNotFound(_)
            | E::ColumnIndexOutOfBounds { .. }
            | E::Decode(_)
            | E::TypeNotFound { .. } => QueryErrorKind::Malformed,
            _ => QueryErrorKind::Unavailable,
        };
        Self::new(stage, kind, err.to_string())
    }
}
