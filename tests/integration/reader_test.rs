use std::sync::Arc;

use arrow::array::{Array, AsArray};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sales_etl::schema::raw_sales_schema;
use sales_etl::{
    CopyOptions, CsvSource, ParquetSource, PipelineError, RawSalesRecord, Result, expand_glob,
    raw_sales_batch, write_table, Table,
};

use crate::utils::write_sales_csv;

fn random_records(rng: &mut StdRng, count: usize) -> Vec<RawSalesRecord> {
    (0..count)
        .map(|i| {
            let quantity = rng.random_range(1..10).to_string();
            RawSalesRecord::new(
                &i.to_string(),
                "USB-C Charging Cable",
                &quantity,
                "11.95",
                "2019-04-19",
                "917 1st St, Dallas, TX 75001",
            )
        })
        .collect()
}

/// The combined row count equals the sum of the per-file row counts
#[test]
fn test_row_count_is_sum_of_files() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);

    for round in 0..5 {
        let dir = tempfile::tempdir()?;
        let file_count = rng.random_range(1..=6);
        let mut expected = 0;
        for file in 0..file_count {
            let rows = rng.random_range(0..40);
            expected += rows;
            let records = random_records(&mut rng, rows);
            write_sales_csv(dir.path(), &format!("Sales_{round}_{file}.csv"), &records);
        }

        let pattern = dir.path().join("Sales*.csv");
        let table = CsvSource::new(pattern.to_string_lossy())
            .with_schema(raw_sales_schema())
            .with_batch_size(7)
            .read_table()?;

        assert_eq!(table.num_rows(), expected, "round {round}");
        assert!(table.batches().iter().all(|batch| batch.num_rows() <= 7));
    }

    Ok(())
}

#[test]
fn test_files_are_opened_lazily() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut rng = StdRng::seed_from_u64(7);
    write_sales_csv(dir.path(), "Sales_1.csv", &random_records(&mut rng, 3));
    write_sales_csv(dir.path(), "Sales_2.csv", &random_records(&mut rng, 3));

    let pattern = dir.path().join("Sales*.csv");
    let mut batches = CsvSource::new(pattern.to_string_lossy()).into_batches()?;
    assert_eq!(batches.files_opened(), 0);
    assert_eq!(batches.remaining_files().len(), 2);

    let first = batches.next().transpose()?;
    assert_eq!(first.map(|batch| batch.num_rows()), Some(3));
    assert_eq!(batches.files_opened(), 1);

    assert_eq!(batches.by_ref().count(), 1);
    assert_eq!(batches.files_opened(), 2);
    assert!(batches.next().is_none());
    Ok(())
}

#[test]
fn test_header_defines_text_columns() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let records = [RawSalesRecord::new("1", "A", "2", "10.0", "2023-01-15", "1 X St, Boston, MA")];
    write_sales_csv(dir.path(), "Sales_1.csv", &records);

    let pattern = dir.path().join("*.csv");
    let table = CsvSource::new(pattern.to_string_lossy()).read_table()?;

    assert_eq!(table.schema(), raw_sales_schema());
    let batch = table.concat()?;
    let address = batch.column(6).as_string::<i32>();
    assert_eq!(address.value(0), "1 X St, Boston, MA");
    // Empty fields are read as null
    assert!(batch.column(5).is_null(0));
    Ok(())
}

#[test]
fn test_no_matching_files_is_empty() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let pattern = dir.path().join("Sales*.csv");

    assert!(expand_glob(&pattern.to_string_lossy())?.is_empty());

    let typed = CsvSource::new(pattern.to_string_lossy())
        .with_schema(raw_sales_schema())
        .read_table()?;
    assert!(typed.is_empty());
    assert_eq!(typed.schema(), raw_sales_schema());

    let untyped = CsvSource::new(pattern.to_string_lossy()).read_table()?;
    assert!(untyped.is_empty());
    assert!(untyped.schema().fields().is_empty());
    Ok(())
}

#[test]
fn test_invalid_pattern_is_an_error() {
    let err = expand_glob("dataset/[.csv").unwrap_err();
    assert!(matches!(err, PipelineError::Pattern { .. }));
}

#[test]
fn test_parquet_restores_hive_columns() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut missing_type = RawSalesRecord::new("3", "C", "1", "2.5", "2023-03-01", "9 Z Rd, Austin, TX");
    missing_type.product_type = None;
    let records = [
        RawSalesRecord::new("1", "A", "2", "10.0", "2023-01-15", "123 X St, Boston, MA")
            .with_product_type("Phone"),
        missing_type,
    ];
    let batch = raw_sales_batch(&records)?;
    let table = Table::new(Arc::clone(&batch.schema()), vec![batch]);

    let root = dir.path().join("sales_partition");
    let options = CopyOptions::parquet().with_partition_by(["City", "Product Type"]);
    write_table(&table, &root, &options)?;

    let pattern = root.join("*/*/*.parquet");
    let plain = ParquetSource::new(pattern.to_string_lossy()).read_table()?;
    assert_eq!(plain.schema().fields().len(), 7);

    let restored = ParquetSource::new(pattern.to_string_lossy())
        .with_hive_partitioning(true)
        .read_table()?;
    let schema = restored.schema();
    assert_eq!(schema.fields().len(), 9);
    assert_eq!(schema.field(7).name(), "City");
    assert_eq!(schema.field(8).name(), "Product Type");

    // Partitions are read back in path order: Austin before Boston
    let batch = restored.concat()?;
    let cities = batch.column(7).as_string::<i32>();
    let types = batch.column(8).as_string::<i32>();
    assert_eq!(cities.value(0), "Austin");
    assert!(types.is_null(0));
    assert_eq!(cities.value(1), "Boston");
    assert_eq!(types.value(1), "Phone");
    Ok(())
}
