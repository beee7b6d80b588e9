use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Connection error: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Query error for {date}: {source}")]
    Query {
        date: NaiveDate,
        #[source]
        source: sqlx::Error,
    },

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error at {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl ExportError {
    /// Whether the error ends the whole run regardless of the failure policy.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ExportError::Query { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::Config(_) => "config",
            ExportError::Template(_) => "template",
            ExportError::Connection(_) => "connection",
            ExportError::Query { .. } => "query",
            ExportError::Filesystem { .. } => "filesystem",
            ExportError::Csv { .. } => "csv",
        }
    }
}

pub type ExportResult<T> = Result<T, ExportError>;
