use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to build a [`RecordStore`](super::model::RecordStore) from a source.
///
/// Any of these aborts the load: no partial store is ever constructed.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
    #[error("source is missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("row {row}, column '{column}': '{value}' {reason}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("source contains no records")]
    Empty,
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed Parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("unreadable Arrow data: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl IngestError {
    pub(crate) fn invalid(
        row: usize,
        column: &'static str,
        value: impl Into<String>,
        reason: &'static str,
    ) -> Self {
        IngestError::InvalidValue {
            row,
            column,
            value: value.into(),
            reason,
        }
    }
}
