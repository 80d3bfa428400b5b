use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use sales_etl::schema::raw_sales_schema;
use sales_etl::{
    CopyOptions, CopySummary, ExistingOutput, FileFormat, GroupedQuery, PipelineError,
    RawSalesRecord, Result, Session, Table, raw_sales_batch, write_table,
};

use crate::utils::{boston_nyc_records, file_tree};

fn raw_table() -> Result<Table> {
    let (boston, nyc) = boston_nyc_records();
    let batch = raw_sales_batch(&[boston, nyc])?;
    Ok(Table::new(Arc::clone(&batch.schema()), vec![batch]))
}

#[test]
fn test_flat_csv_round_trips_text() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("result.csv");

    let summary = write_table(&raw_table()?, &path, &CopyOptions::csv())?;
    assert_eq!(summary, CopySummary { rows: 2, files: 1 });

    let text = fs::read_to_string(&path)?;
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some(crate::utils::SALES_HEADER));
    assert_eq!(
        lines.next(),
        Some("1,A,2,10.0,2023-01-15,,\"123 X St, Boston, MA\",Boston,Phone")
    );
    Ok(())
}

#[test]
fn test_flat_output_is_replaced() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("result-snappy.parquet");
    fs::write(&path, b"stale")?;

    write_table(&raw_table()?, &path, &CopyOptions::parquet())?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(fs::File::open(&path)?)?;
    assert_eq!(reader.metadata().file_metadata().num_rows(), 2);
    Ok(())
}

#[test]
fn test_partition_tree_layout() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("sales_partition");
    let options = CopyOptions::parquet().with_partition_by(["City", "Product Type"]);

    let summary = write_table(&raw_table()?, &root, &options)?;
    assert_eq!(summary, CopySummary { rows: 2, files: 2 });
    assert_eq!(
        file_tree(&root),
        vec![
            PathBuf::from("City=Boston/Product Type=Phone/data_0.parquet"),
            PathBuf::from("City=NYC/Product Type=Laptop/data_0.parquet"),
        ]
    );

    // Partition columns are not stored in the files
    let file = fs::File::open(root.join("City=NYC/Product Type=Laptop/data_0.parquet"))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?;
    assert_eq!(reader.schema().fields().len(), 7);
    assert!(reader.schema().field_with_name("City").is_err());
    Ok(())
}

#[test]
fn test_overwrite_or_ignore_keeps_other_partitions() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("sales_partition");
    let stale = root.join("City=Paris/Product Type=Phone/data_0.parquet");
    fs::create_dir_all(stale.parent().unwrap_or(&root))?;
    fs::write(&stale, b"from an earlier run")?;

    let options = CopyOptions::parquet()
        .with_partition_by(["City", "Product Type"])
        .with_existing(ExistingOutput::OverwriteOrIgnore);
    write_table(&raw_table()?, &root, &options)?;
    write_table(&raw_table()?, &root, &options)?;

    assert_eq!(fs::read(&stale)?, b"from an earlier run");
    assert_eq!(file_tree(&root).len(), 3);
    Ok(())
}

#[test]
fn test_error_policy() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("out");
    let options = CopyOptions::new(FileFormat::csv())
        .with_partition_by(["City"])
        .with_existing(ExistingOutput::Error);

    write_table(&raw_table()?, &root, &options)?;
    let err = write_table(&raw_table()?, &root, &options).unwrap_err();
    assert!(matches!(err, PipelineError::OutputExists(path) if path == root));
    Ok(())
}

#[test]
fn test_partition_columns_can_be_kept() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("out");
    let options = CopyOptions::csv()
        .with_partition_by(["City"])
        .with_write_partition_columns(true);
    write_table(&raw_table()?, &root, &options)?;

    let text = fs::read_to_string(root.join("City=NYC/data_0.csv"))?;
    assert!(text.starts_with(crate::utils::SALES_HEADER));
    Ok(())
}

#[test]
fn test_unknown_partition_column() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let options = CopyOptions::parquet().with_partition_by(["Country"]);
    let err = write_table(&raw_table()?, dir.path(), &options).unwrap_err();
    assert!(matches!(err, PipelineError::ColumnNotFound(_)));
    Ok(())
}

#[test]
fn test_empty_outputs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let empty = Table::empty(raw_sales_schema());

    let csv = dir.path().join("empty.csv");
    write_table(&empty, &csv, &CopyOptions::csv())?;
    assert_eq!(fs::read_to_string(&csv)?.trim_end(), crate::utils::SALES_HEADER);

    let root = dir.path().join("empty_partition");
    let summary = write_table(
        &empty,
        &root,
        &CopyOptions::parquet().with_partition_by(["City"]),
    )?;
    assert_eq!(summary, CopySummary::default());
    assert!(root.is_dir());
    assert!(file_tree(&root).is_empty());
    Ok(())
}

#[test]
fn test_copy_view_from_session() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut session = Session::open();
    let records = [RawSalesRecord::new("1", "A", "2", "10.0", "2023-01-15", "1 X St, Boston, MA")];
    let batch = raw_sales_batch(&records)?;
    session.create_table("raw", Table::new(Arc::clone(&batch.schema()), vec![batch]))?;
    sales_etl::normalize_into(
        &mut session,
        "raw",
        "sales",
        &sales_etl::NormalizationPlan::sales(),
        &sales_etl::DateFormatConfig::default(),
    )?;
    session.create_or_replace_view("agg", Arc::new(GroupedQuery::sales_aggregate()))?;

    let root = dir.path().join("aggregate_partition");
    let options = CopyOptions::parquet().with_partition_by(["city", "product"]);
    let summary = session.copy_to("agg", &root, &options)?;

    assert_eq!(summary.files, 1);
    assert_eq!(
        file_tree(&root),
        vec![PathBuf::from("city= Boston/product=A/data_0.parquet")]
    );
    Ok(())
}
