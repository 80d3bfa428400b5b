//! Error handling for the sales pipeline.

use std::io;
use std::path::PathBuf;

use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Error opening, reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error raised by an Arrow compute kernel or codec
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// The input glob could not be parsed
    #[error("Invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Records could not be converted to or from Arrow
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_arrow::Error),

    /// A strict cast met a value it could not convert
    #[error("Strict cast of column '{column}' to {data_type} failed: {message}")]
    StrictCast {
        column: String,
        data_type: DataType,
        message: String,
    },

    /// A referenced column does not exist
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// A referenced table or view does not exist
    #[error("Table or view not found: {0}")]
    RelationNotFound(String),

    /// A table or view with the same name already exists
    #[error("Table or view already exists: {0}")]
    RelationExists(String),

    /// An expression cannot be evaluated against its input
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    /// The output location already holds data and the policy forbids writing
    #[error("Output already exists and is not empty: {}", .0.display())]
    OutputExists(PathBuf),
}

impl From<glob::GlobError> for PipelineError {
    fn from(error: glob::GlobError) -> Self {
        Self::Io(error.into_error())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
