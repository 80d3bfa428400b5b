//! Single-file CSV and Parquet writers.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use arrow::csv::WriterBuilder;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::Result;
use crate::session::Table;
use crate::sink::FileFormat;

/// Writes `table` as one file at `path`, replacing any existing file
///
/// Missing parent directories are created. An empty table still produces a
/// readable file: a header-only CSV or a zero-row Parquet file.
pub fn write_file(table: &Table, path: &Path, format: FileFormat) -> Result<()> {
    write_batches(&table.schema(), table.batches(), path, format)
}

/// Writes `batches` of `schema` as one file at `path`
pub(crate) fn write_batches(
    schema: &SchemaRef,
    batches: &[RecordBatch],
    path: &Path,
    format: FileFormat,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    match format {
        FileFormat::Csv { delimiter, header } => write_csv(schema, batches, path, delimiter, header),
        FileFormat::Parquet { compression } => write_parquet(schema, batches, path, compression),
    }
}

fn write_csv(
    schema: &SchemaRef,
    batches: &[RecordBatch],
    path: &Path,
    delimiter: u8,
    header: bool,
) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    let mut writer = WriterBuilder::new()
        .with_header(header)
        .with_delimiter(delimiter)
        .build(file);

    if batches.is_empty() {
        // The header is written with the first batch
        writer.write(&RecordBatch::new_empty(SchemaRef::clone(schema)))?;
    }
    for batch in batches {
        writer.write(batch)?;
    }

    writer.into_inner().flush()?;
    Ok(())
}

fn write_parquet(
    schema: &SchemaRef,
    batches: &[RecordBatch],
    path: &Path,
    compression: Compression,
) -> Result<()> {
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(compression)
        .build();
    let mut writer = ArrowWriter::try_new(file, SchemaRef::clone(schema), Some(props))?;

    for batch in batches {
        writer.write(batch)?;
    }

    writer.close()?;
    Ok(())
}
