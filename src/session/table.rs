//! In-memory tables made of Arrow record batches.

use arrow::compute::concat_batches;
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::error::{PipelineError, Result};

/// A materialized relation: a schema and the batches that hold its rows
#[derive(Debug, Clone)]
pub struct Table {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Table {
    /// Creates a table from batches that all share `schema`
    #[must_use]
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    /// Creates a table with no rows
    #[must_use]
    pub fn empty(schema: SchemaRef) -> Self {
        Self::new(schema, Vec::new())
    }

    /// Collects a fallible stream of batches into a table
    ///
    /// Empty batches are dropped. The first error aborts collection.
    pub fn try_from_batches<I>(schema: SchemaRef, batches: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<RecordBatch>>,
    {
        let mut collected = Vec::new();
        for batch in batches {
            let batch = batch?;
            if batch.num_rows() > 0 {
                collected.push(batch);
            }
        }
        Ok(Self::new(schema, collected))
    }

    /// The table schema
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// The batches holding the rows of this table
    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Total number of rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Whether the table holds no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Concatenates all batches into one
    pub fn concat(&self) -> Result<RecordBatch> {
        Ok(concat_batches(&self.schema, &self.batches)?)
    }
}

/// Resolve a column name against a schema
///
/// An exact match wins. Otherwise a single case-insensitive match is
/// accepted, the way SQL identifiers resolve.
///
/// # Errors
/// Returns `PipelineError::ColumnNotFound` if no column (or more than one
/// case-insensitive candidate) matches.
pub fn resolve_column(schema: &Schema, name: &str) -> Result<usize> {
    if let Ok(index) = schema.index_of(name) {
        return Ok(index);
    }

    let mut candidates = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, field)| field.name().eq_ignore_ascii_case(name))
        .map(|(index, _)| index);

    match (candidates.next(), candidates.next()) {
        (Some(index), None) => Ok(index),
        _ => Err(PipelineError::ColumnNotFound(name.to_string())),
    }
}
