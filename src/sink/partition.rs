//! Hive-style partitioned output.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use itertools::Itertools;

use crate::error::{PipelineError, Result};
use crate::session::{Table, resolve_column};
use crate::sink::{CopyOptions, CopySummary, ExistingOutput, flat};
use crate::utils::logging::log_warning;
use crate::utils::paths::partition_dir_name;

/// Partition key of one row: the formatted value of every partition column
type PartitionKey = Vec<Option<String>>;

/// Writes `table` under `root`, one file per distinct partition key
///
/// Files are named `data_0.<ext>` inside `col=value` directories and are
/// written in sorted key order. Partition columns are left out of the files
/// unless `options.write_partition_columns` is set.
pub fn write_partitioned(table: &Table, root: &Path, options: &CopyOptions) -> Result<CopySummary> {
    let schema = table.schema();
    let partition_indices: Vec<usize> = options
        .partition_by
        .iter()
        .map(|name| resolve_column(&schema, name))
        .try_collect()?;
    let partition_names: Vec<&str> = partition_indices
        .iter()
        .map(|&i| schema.field(i).name().as_str())
        .collect();

    let data_indices: Vec<usize> = if options.write_partition_columns {
        (0..schema.fields().len()).collect()
    } else {
        (0..schema.fields().len())
            .filter(|i| !partition_indices.contains(i))
            .collect()
    };
    if data_indices.is_empty() {
        return Err(PipelineError::InvalidExpression(
            "cannot partition by every column of the table".to_string(),
        ));
    }

    prepare_root(root, options.existing)?;
    if table.is_empty() {
        log_warning("No rows to partition", Some(root));
        return Ok(CopySummary::default());
    }

    let batch = table.concat()?;
    let partitions = group_rows(&batch, &partition_indices)?;
    let file_name = format!("data_0.{}", options.format.extension());
    let data_schema = Arc::new(schema.project(&data_indices)?);

    let mut summary = CopySummary::default();
    for (key, rows) in partitions {
        let dir = partition_dir(root, &partition_names, &key);
        let indices = UInt32Array::from(rows);
        let rows = take_record_batch(&batch, &indices)?.project(&data_indices)?;

        log::debug!("Writing {} rows to {}", rows.num_rows(), dir.display());
        flat::write_batches(&data_schema, &[rows], &dir.join(&file_name), options.format)?;

        summary.rows += indices.len();
        summary.files += 1;
    }

    Ok(summary)
}

/// Applies the existing-output policy and makes sure `root` exists
fn prepare_root(root: &Path, existing: ExistingOutput) -> Result<()> {
    if root.exists() {
        let occupied = !root.is_dir() || fs::read_dir(root)?.next().is_some();
        match existing {
            ExistingOutput::Error if occupied => {
                return Err(PipelineError::OutputExists(root.to_path_buf()));
            }
            ExistingOutput::Overwrite if root.is_dir() => fs::remove_dir_all(root)?,
            ExistingOutput::Overwrite => fs::remove_file(root)?,
            _ => {}
        }
    }

    fs::create_dir_all(root)?;
    Ok(())
}

/// Row indices of `batch` per partition key, keys in sorted order
fn group_rows(
    batch: &RecordBatch,
    partition_indices: &[usize],
) -> Result<BTreeMap<PartitionKey, Vec<u32>>> {
    let options = FormatOptions::default();
    let formatters: Vec<(&dyn Array, ArrayFormatter<'_>)> = partition_indices
        .iter()
        .map(|&i| {
            let column = batch.column(i).as_ref();
            ArrayFormatter::try_new(column, &options).map(|formatter| (column, formatter))
        })
        .try_collect()?;

    let mut partitions: BTreeMap<PartitionKey, Vec<u32>> = BTreeMap::new();
    for row in 0..batch.num_rows() {
        let key = formatters
            .iter()
            .map(|(column, formatter)| column.is_valid(row).then(|| formatter.value(row).to_string()))
            .collect();
        let row = u32::try_from(row).map_err(|_| {
            PipelineError::InvalidExpression("too many rows in one partitioned write".to_string())
        })?;
        partitions.entry(key).or_default().push(row);
    }
    Ok(partitions)
}

fn partition_dir(root: &Path, names: &[&str], key: &[Option<String>]) -> PathBuf {
    names
        .iter()
        .zip(key)
        .fold(root.to_path_buf(), |dir, (name, value)| {
            dir.join(partition_dir_name(name, value.as_deref()))
        })
}
