//! Module for reading many files as one stream of record batches.
//!
//! A glob is expanded into a sorted list of files; [`SourceBatches`] then
//! opens them one at a time and yields their batches back to back. Files are
//! only opened when the previous one is exhausted, and the stream cannot be
//! restarted once consumed.

pub mod csv;
pub mod parquet;

use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

pub use self::csv::{CsvFileReader, CsvSource};
pub use self::parquet::{ParquetFileReader, ParquetSource};

use crate::error::{PipelineError, Result};
use crate::utils::{log_operation_complete, log_operation_start, log_warning};

/// Default number of rows per batch when reading files
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Expand a glob into the sorted list of matching files
///
/// Directories matched by the pattern are skipped. A pattern that matches
/// nothing yields an empty list.
///
/// # Errors
/// Returns `PipelineError::Pattern` if the pattern is malformed, or an IO
/// error if a matched path cannot be read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|source| PipelineError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        log_warning("No files match pattern", Some(Path::new(pattern)));
    } else {
        log::debug!("Pattern {pattern} matched {} files", files.len());
    }

    Ok(files)
}

/// Opens one file of a given format as a stream of batches
pub trait FileReader {
    /// Batch iterator over a single open file
    type Batches: Iterator<Item = Result<RecordBatch>>;

    /// Open `path` for reading
    fn open(&self, path: &Path) -> Result<Self::Batches>;
}

/// Batches from every file matched by a pattern, in path order
pub struct SourceBatches<R: FileReader> {
    reader: R,
    pattern: String,
    schema: SchemaRef,
    paths: std::vec::IntoIter<PathBuf>,
    current: Option<R::Batches>,
    files_opened: usize,
    rows_read: usize,
    started: Instant,
    finished: bool,
}

impl<R: FileReader> SourceBatches<R> {
    pub(crate) fn new(reader: R, pattern: String, schema: SchemaRef, paths: Vec<PathBuf>) -> Self {
        log_operation_start("Reading files matching", Path::new(&pattern));
        Self {
            reader,
            pattern,
            schema,
            paths: paths.into_iter(),
            current: None,
            files_opened: 0,
            rows_read: 0,
            started: Instant::now(),
            finished: false,
        }
    }

    /// Schema shared by every batch of the stream
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Files not yet opened
    #[must_use]
    pub fn remaining_files(&self) -> &[PathBuf] {
        self.paths.as_slice()
    }

    /// Number of files opened so far
    #[must_use]
    pub const fn files_opened(&self) -> usize {
        self.files_opened
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            log_operation_complete(
                "read",
                Path::new(&self.pattern),
                self.rows_read,
                Some(self.started.elapsed()),
            );
        }
    }
}

impl<R: FileReader> Iterator for SourceBatches<R> {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Drain the current file first
            if let Some(batches) = &mut self.current {
                match batches.next() {
                    Some(Ok(batch)) => {
                        self.rows_read += batch.num_rows();
                        return Some(Ok(batch));
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => self.current = None,
                }
            }

            // Then move on to the next file
            let Some(path) = self.paths.next() else {
                self.finish();
                return None;
            };

            log::debug!("Opening {}", path.display());
            match self.reader.open(&path) {
                Ok(batches) => {
                    self.files_opened += 1;
                    self.current = Some(batches);
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
