//! Reading delimited text files.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::error::{PipelineError, Result};
use crate::reader::{DEFAULT_BATCH_SIZE, FileReader, SourceBatches, expand_glob};
use crate::session::Table;

/// Opens single CSV files with a fixed schema
#[derive(Debug, Clone)]
pub struct CsvFileReader {
    schema: SchemaRef,
    delimiter: u8,
    has_header: bool,
    batch_size: usize,
}

impl FileReader for CsvFileReader {
    type Batches = Box<dyn Iterator<Item = Result<RecordBatch>>>;

    fn open(&self, path: &Path) -> Result<Self::Batches> {
        let file = File::open(path).map_err(|e| {
            PipelineError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open file {}: {e}", path.display()),
            ))
        })?;

        let reader = ReaderBuilder::new(self.schema.clone())
            .with_header(self.has_header)
            .with_delimiter(self.delimiter)
            .with_batch_size(self.batch_size)
            .build(file)?;

        Ok(Box::new(reader.map(|batch| batch.map_err(PipelineError::from))))
    }
}

/// A glob of CSV files read as one table
///
/// Every column is read as nullable text; empty fields are null. Typing the
/// columns is left to the normalizer.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pattern: String,
    schema: Option<SchemaRef>,
    delimiter: u8,
    has_header: bool,
    batch_size: usize,
}

impl CsvSource {
    /// Creates a source over every file matching `pattern`
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            schema: None,
            delimiter: b',',
            has_header: true,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Use a fixed schema instead of the first file's header
    #[must_use]
    pub fn with_schema(mut self, schema: SchemaRef) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Field delimiter, `,` by default
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Whether the first line of every file is a header, `true` by default
    #[must_use]
    pub const fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Rows per batch
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// The glob this source reads
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Expands the glob and returns the lazy batch stream
    ///
    /// No file matching the pattern is not an error: the stream is empty and
    /// its schema is the configured one, or an empty schema when none was
    /// given.
    pub fn into_batches(self) -> Result<SourceBatches<CsvFileReader>> {
        let paths = expand_glob(&self.pattern)?;

        let schema = match (&self.schema, paths.first()) {
            (Some(schema), _) => schema.clone(),
            (None, Some(first)) => self.infer_text_schema(first)?,
            (None, None) => Arc::new(Schema::empty()),
        };

        let reader = CsvFileReader {
            schema: schema.clone(),
            delimiter: self.delimiter,
            has_header: self.has_header,
            batch_size: self.batch_size,
        };

        Ok(SourceBatches::new(reader, self.pattern, schema, paths))
    }

    /// Reads every matching file into one table
    pub fn read_table(self) -> Result<Table> {
        let batches = self.into_batches()?;
        let schema = batches.schema();
        Table::try_from_batches(schema, batches)
    }

    /// Column names from the header of `path`, all typed as nullable text
    fn infer_text_schema(&self, path: &Path) -> Result<SchemaRef> {
        let file = File::open(path)?;
        let (inferred, _) = Format::default()
            .with_header(self.has_header)
            .with_delimiter(self.delimiter)
            .infer_schema(file, Some(0))?;

        let fields: Vec<Field> = inferred
            .fields()
            .iter()
            .map(|field| Field::new(field.name(), DataType::Utf8, true))
            .collect();

        Ok(Arc::new(Schema::new(fields)))
    }
}
