//! A columnar ETL pipeline over sales CSV files.
//!
//! Input files are read lazily into Arrow record batches, held in a
//! [`Session`] catalog of named tables and views, typed by a fixed cast
//! plan, aggregated, and exported as CSV or Parquet, flat or Hive-style
//! partitioned.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod reader;
pub mod schema;
pub mod session;
pub mod sink;
pub mod utils;

// Re-export the most common types for easier use
pub use aggregate::{AggregateFn, Expr, GroupedQuery, SelectItem};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use models::{RawSalesRecord, raw_sales_batch};
pub use pipeline::{PipelineReport, StepReport};
pub use reader::{CsvSource, DEFAULT_BATCH_SIZE, ParquetSource, expand_glob};
pub use schema::{CastMode, ColumnCast, DateFormatConfig, NormalizationPlan, normalize_into};
pub use session::{ColumnDescription, Session, Table};
pub use sink::{CopyOptions, CopySummary, ExistingOutput, FileFormat, write_table};

// Arrow types
pub use arrow::datatypes::Schema as ArrowSchema;
pub use arrow::record_batch::RecordBatch;
