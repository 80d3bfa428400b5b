//! Reading Parquet files, optionally with Hive partition columns.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};

use crate::error::{PipelineError, Result};
use crate::reader::{DEFAULT_BATCH_SIZE, FileReader, SourceBatches, expand_glob};
use crate::session::Table;
use crate::utils::paths::{PartitionValues, partition_values};

/// Opens single Parquet files
#[derive(Debug, Clone)]
pub struct ParquetFileReader {
    hive_partitioning: bool,
    batch_size: usize,
}

impl ParquetFileReader {
    fn builder(path: &Path) -> Result<ParquetRecordBatchReaderBuilder<File>> {
        let file = File::open(path).map_err(|e| {
            PipelineError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open file {}: {e}", path.display()),
            ))
        })?;
        Ok(ParquetRecordBatchReaderBuilder::try_new(file)?)
    }

    /// Schema of `path`, including partition columns when enabled
    fn schema_of(&self, path: &Path) -> Result<SchemaRef> {
        let file_schema = Self::builder(path)?.schema().clone();
        let partitions = self.partitions_of(&file_schema, path);
        Ok(with_partition_fields(&file_schema, &partitions))
    }

    /// Partition columns of `path` that the file does not already contain
    fn partitions_of(&self, file_schema: &Schema, path: &Path) -> PartitionValues {
        if !self.hive_partitioning {
            return PartitionValues::new();
        }
        partition_values(path)
            .into_iter()
            .filter(|(key, _)| file_schema.index_of(key).is_err())
            .collect()
    }
}

impl FileReader for ParquetFileReader {
    type Batches = PartitionedBatches;

    fn open(&self, path: &Path) -> Result<Self::Batches> {
        let builder = Self::builder(path)?;
        let file_schema = builder.schema().clone();
        let inner = builder.with_batch_size(self.batch_size).build()?;

        let partitions = self.partitions_of(&file_schema, path);
        let schema = with_partition_fields(&file_schema, &partitions);

        Ok(PartitionedBatches {
            inner,
            schema,
            partitions,
        })
    }
}

/// Batches of one Parquet file with constant partition columns appended
pub struct PartitionedBatches {
    inner: ParquetRecordBatchReader,
    schema: SchemaRef,
    partitions: PartitionValues,
}

impl Iterator for PartitionedBatches {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch = match self.inner.next()? {
            Ok(batch) => batch,
            Err(e) => return Some(Err(e.into())),
        };

        if self.partitions.is_empty() {
            return Some(Ok(batch));
        }

        let rows = batch.num_rows();
        let mut columns = batch.columns().to_vec();
        columns.extend(self.partitions.iter().map(|(_, value)| {
            Arc::new(StringArray::from(vec![value.as_deref(); rows])) as ArrayRef
        }));

        Some(RecordBatch::try_new(self.schema.clone(), columns).map_err(PipelineError::from))
    }
}

fn with_partition_fields(file_schema: &SchemaRef, partitions: &PartitionValues) -> SchemaRef {
    if partitions.is_empty() {
        return file_schema.clone();
    }

    let mut fields: Vec<Field> = file_schema
        .fields()
        .iter()
        .map(|field| field.as_ref().clone())
        .collect();
    fields.extend(
        partitions
            .iter()
            .map(|(key, _)| Field::new(key, DataType::Utf8, true)),
    );
    Arc::new(Schema::new(fields))
}

/// A glob of Parquet files read as one table
#[derive(Debug, Clone)]
pub struct ParquetSource {
    pattern: String,
    hive_partitioning: bool,
    batch_size: usize,
}

impl ParquetSource {
    /// Creates a source over every file matching `pattern`
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            hive_partitioning: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Restore `key=value` directory components as trailing text columns
    #[must_use]
    pub const fn with_hive_partitioning(mut self, enabled: bool) -> Self {
        self.hive_partitioning = enabled;
        self
    }

    /// Rows per batch
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Expands the glob and returns the lazy batch stream
    ///
    /// The stream schema is taken from the first file; an empty match gives
    /// an empty stream with an empty schema.
    pub fn into_batches(self) -> Result<SourceBatches<ParquetFileReader>> {
        let paths = expand_glob(&self.pattern)?;
        let reader = ParquetFileReader {
            hive_partitioning: self.hive_partitioning,
            batch_size: self.batch_size,
        };

        let schema = match paths.first() {
            Some(first) => reader.schema_of(first)?,
            None => Arc::new(Schema::empty()),
        };

        Ok(SourceBatches::new(reader, self.pattern, schema, paths))
    }

    /// Reads every matching file into one table
    pub fn read_table(self) -> Result<Table> {
        let batches = self.into_batches()?;
        let schema = batches.schema();
        Table::try_from_batches(schema, batches)
    }
}
