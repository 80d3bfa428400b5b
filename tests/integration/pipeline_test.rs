use std::fs;

use arrow::array::AsArray;
use arrow::datatypes::Decimal128Type;
use sales_etl::pipeline::{
    AGGREGATE_PARQUET, AGGREGATE_PARTITION, RESULT_CSV, RESULT_PARQUET, SALES_PARTITION, run,
};
use sales_etl::{ParquetSource, PipelineConfig, PipelineError, RawSalesRecord, Result};

use crate::utils::{file_tree, write_boston_nyc, write_sales_csv};

#[test]
fn test_pipeline_writes_every_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_boston_nyc(dir.path());
    // Only `Sales*.csv` files are read
    write_sales_csv(
        dir.path(),
        "Returns.csv",
        &[RawSalesRecord::new("9", "Z", "1", "1.0", "2023-05-01", "1 Q St, Paris, FR")],
    );

    let config = PipelineConfig::new(dir.path());
    let report = run(&config)?;

    assert_eq!(report.step("read_csv").map(|s| s.rows), Some(2));
    assert_eq!(report.step("export_sales_partition").map(|s| s.files), Some(2));
    assert_eq!(report.step("read_partitioned").map(|s| s.files), Some(2));
    assert_eq!(report.step("normalize").map(|s| s.rows), Some(2));
    assert_eq!(report.step("aggregate").map(|s| s.rows), Some(2));
    assert_eq!(report.sales_columns.len(), 6);

    for name in [RESULT_CSV, RESULT_PARQUET, AGGREGATE_PARQUET] {
        assert!(dir.path().join(name).is_file(), "{name} missing");
    }
    assert_eq!(file_tree(&dir.path().join(SALES_PARTITION)).len(), 2);
    assert_eq!(
        file_tree(&dir.path().join(AGGREGATE_PARTITION))
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect::<Vec<_>>(),
        vec![
            "city= Boston/product=A/data_0.parquet".to_string(),
            "city= NYC/product=B/data_0.parquet".to_string(),
        ]
    );

    // The aggregate file carries the revenue at three decimals
    let aggregate = ParquetSource::new(dir.path().join(AGGREGATE_PARQUET).to_string_lossy())
        .read_table()?
        .concat()?;
    let revenue = aggregate.column(5).as_primitive::<Decimal128Type>();
    let mut values: Vec<i128> = revenue.iter().flatten().collect();
    values.sort_unstable();
    assert_eq!(values, vec![5_000, 20_000]);

    let json = serde_json::to_value(&report).expect("Report should serialize");
    assert_eq!(json["sales_columns"][3]["column_type"], "DECIMAL(18,3)");
    assert!(json.get("aggregate").is_none());
    Ok(())
}

#[test]
fn test_rerun_is_deterministic() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_boston_nyc(dir.path());
    let config = PipelineConfig::new(dir.path());

    run(&config)?;
    let first: Vec<Vec<u8>> = [RESULT_CSV, RESULT_PARQUET, AGGREGATE_PARQUET]
        .iter()
        .map(|name| fs::read(dir.path().join(name)))
        .collect::<std::io::Result<_>>()?;
    let sales_tree = file_tree(&dir.path().join(SALES_PARTITION));
    let aggregate_tree = file_tree(&dir.path().join(AGGREGATE_PARTITION));

    run(&config)?;
    let second: Vec<Vec<u8>> = [RESULT_CSV, RESULT_PARQUET, AGGREGATE_PARQUET]
        .iter()
        .map(|name| fs::read(dir.path().join(name)))
        .collect::<std::io::Result<_>>()?;

    assert_eq!(first, second);
    assert_eq!(file_tree(&dir.path().join(SALES_PARTITION)), sales_tree);
    assert_eq!(file_tree(&dir.path().join(AGGREGATE_PARTITION)), aggregate_tree);
    Ok(())
}

#[test]
fn test_bad_quantity_aborts_the_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_sales_csv(
        dir.path(),
        "Sales_March.csv",
        &[RawSalesRecord::new("1", "A", "two", "10.0", "2023-03-01", "1 X St, Boston, MA")],
    );

    let err = run(&PipelineConfig::new(dir.path())).unwrap_err();
    assert!(matches!(err, PipelineError::StrictCast { .. }));

    // Outputs written before the failing step are kept
    assert!(dir.path().join(RESULT_CSV).is_file());
    assert!(!dir.path().join(AGGREGATE_PARQUET).exists());
    Ok(())
}

#[test]
fn test_empty_dataset() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let report = run(&PipelineConfig::new(dir.path()))?;

    assert_eq!(report.step("read_csv").map(|s| s.rows), Some(0));
    assert_eq!(report.aggregate.map(|table| table.num_rows()), Some(0));
    let csv = fs::read_to_string(dir.path().join(RESULT_CSV))?;
    assert_eq!(csv.lines().count(), 1);
    Ok(())
}
