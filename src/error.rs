//! Error type shared by every fiducial operation.

use thiserror::Error;

/// Errors that can occur while loading, querying, editing or writing fiducials.
#[derive(Error, Debug)]
pub enum FiducialError {
    #[error("invalid construction inputs: {0}")]
    Configuration(String),
    #[error("unrecognised fiducial table with {columns} columns (expected 6 or 14)")]
    Schema { columns: usize },
    #[error("duplicate fiducial label '{0}'")]
    DuplicateLabel(String),
    #[error("invalid point: {0}")]
    Validation(String),
    #[error("unknown fiducial label '{0}'")]
    UnknownLabel(String),
    #[error("fiducial sets have different labels: {0}")]
    Mismatch(String),
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("unsupported fiducial format '{0}'")]
    UnsupportedFormat(String),
    #[error("row {row}: {message}")]
    Parse { row: usize, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, FiducialError>;
