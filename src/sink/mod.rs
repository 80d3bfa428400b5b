//! Writers that export tables to CSV or Parquet files.
//!
//! Output is either a single flat file or a Hive-style directory tree with
//! one `column=value` level per partition column.

pub mod flat;
pub mod partition;

use std::path::Path;
use std::time::Instant;

use parquet::basic::Compression;
use serde::Serialize;

use crate::error::Result;
use crate::session::Table;
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Encoding of written files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Delimited text
    Csv { delimiter: u8, header: bool },
    /// Parquet with the given codec
    Parquet { compression: Compression },
}

impl FileFormat {
    /// CSV with a header row and `,` as delimiter
    #[must_use]
    pub const fn csv() -> Self {
        Self::Csv {
            delimiter: b',',
            header: true,
        }
    }

    /// Snappy-compressed Parquet
    #[must_use]
    pub const fn parquet() -> Self {
        Self::Parquet {
            compression: Compression::SNAPPY,
        }
    }

    /// File extension used for partition files
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv { .. } => "csv",
            Self::Parquet { .. } => "parquet",
        }
    }
}

/// What to do when a partitioned destination already holds files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ExistingOutput {
    /// Refuse to write into a non-empty directory
    Error,
    /// Write over files of the same name and leave the rest untouched
    #[default]
    OverwriteOrIgnore,
    /// Delete the directory before writing
    Overwrite,
}

/// Options of one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOptions {
    pub format: FileFormat,
    /// Partition columns, outermost first; empty for a flat file
    pub partition_by: Vec<String>,
    pub existing: ExistingOutput,
    /// Keep partition columns inside the data files as well
    pub write_partition_columns: bool,
}

impl CopyOptions {
    /// Flat export in `format`
    #[must_use]
    pub const fn new(format: FileFormat) -> Self {
        Self {
            format,
            partition_by: Vec::new(),
            existing: ExistingOutput::OverwriteOrIgnore,
            write_partition_columns: false,
        }
    }

    /// Flat CSV export with a header
    #[must_use]
    pub const fn csv() -> Self {
        Self::new(FileFormat::csv())
    }

    /// Flat Snappy Parquet export
    #[must_use]
    pub const fn parquet() -> Self {
        Self::new(FileFormat::parquet())
    }

    /// Partition the output by `columns`
    #[must_use]
    pub fn with_partition_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partition_by = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Policy for existing partitioned output
    #[must_use]
    pub const fn with_existing(mut self, existing: ExistingOutput) -> Self {
        self.existing = existing;
        self
    }

    /// Keep partition columns in the data files
    #[must_use]
    pub const fn with_write_partition_columns(mut self, write: bool) -> Self {
        self.write_partition_columns = write;
        self
    }

    /// Whether the export writes a directory tree
    #[must_use]
    pub fn is_partitioned(&self) -> bool {
        !self.partition_by.is_empty()
    }
}

/// Rows and files produced by one export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CopySummary {
    pub rows: usize,
    pub files: usize,
}

/// Writes `table` to `destination`
///
/// Without partition columns `destination` is the output file, replaced if
/// it exists. Otherwise it is the root directory of the partition tree.
pub fn write_table(table: &Table, destination: &Path, options: &CopyOptions) -> Result<CopySummary> {
    let start = Instant::now();
    log_operation_start("Writing", destination);

    let summary = if options.is_partitioned() {
        partition::write_partitioned(table, destination, options)?
    } else {
        flat::write_file(table, destination, options.format)?;
        CopySummary {
            rows: table.num_rows(),
            files: 1,
        }
    };

    log::debug!("Wrote {} files to {}", summary.files, destination.display());
    log_operation_complete("wrote", destination, summary.rows, Some(start.elapsed()));
    Ok(summary)
}
