use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Date32Type, Decimal128Type, Int32Type};
use sales_etl::schema::normalized_sales_schema;
use sales_etl::{
    DateFormatConfig, NormalizationPlan, PipelineError, RawSalesRecord, Result, Session, Table,
    normalize_into, raw_sales_batch,
};

use crate::utils::session_with;

fn raw_table(records: &[RawSalesRecord]) -> Result<Table> {
    let batch = raw_sales_batch(records)?;
    Ok(Table::new(Arc::clone(&batch.schema()), vec![batch]))
}

fn normalize(session: &mut Session) -> Result<usize> {
    normalize_into(
        session,
        "raw",
        "sales",
        &NormalizationPlan::sales(),
        &DateFormatConfig::default(),
    )
}

#[test]
fn test_sales_columns_are_typed() -> Result<()> {
    let records = [RawSalesRecord::new("7", "A", "2", "11.95", "2023-01-15", "1 X St, Boston, MA")];
    let mut session = session_with("raw", raw_table(&records)?);

    assert_eq!(normalize(&mut session)?, 1);
    let sales = session.scan("sales")?;
    assert_eq!(sales.schema(), normalized_sales_schema());

    let batch = sales.concat()?;
    assert_eq!(batch.column(0).as_primitive::<Int32Type>().value(0), 7);
    assert_eq!(batch.column(2).as_primitive::<Int32Type>().value(0), 2);
    assert_eq!(batch.column(3).as_primitive::<Decimal128Type>().value(0), 11_950);
    assert_eq!(
        batch.column(4).as_primitive::<Date32Type>().value_as_date(0),
        chrono::NaiveDate::from_ymd_opt(2023, 1, 15)
    );
    assert_eq!(batch.column(5).as_string::<i32>().value(0), "1 X St, Boston, MA");
    Ok(())
}

#[test]
fn test_tolerant_columns_keep_the_row() -> Result<()> {
    // A repeated header row inside a file, as found in the monthly sales dumps
    let header_row =
        RawSalesRecord::new("Order ID", "Product", "3", "Price", "Order Date", "Purchase Address");
    let records = [
        header_row,
        RawSalesRecord::new("2", "B", "1", "5.0", "2023-02-20", "456 Y Ave, NYC, NY"),
    ];
    let mut session = session_with("raw", raw_table(&records)?);

    assert_eq!(normalize(&mut session)?, 2);
    let batch = session.scan("sales")?.concat()?;
    assert!(batch.column(0).is_null(0));
    assert!(batch.column(3).is_null(0));
    assert!(batch.column(4).is_null(0));
    assert_eq!(batch.column(1).as_string::<i32>().value(0), "Product");
    assert_eq!(batch.column(0).as_primitive::<Int32Type>().value(1), 2);
    Ok(())
}

#[test]
fn test_non_numeric_quantity_fails() -> Result<()> {
    let records = [
        RawSalesRecord::new("1", "A", "2", "10.0", "2023-01-15", "1 X St, Boston, MA"),
        RawSalesRecord::new("2", "B", "Quantity Ordered", "5.0", "2023-02-20", "2 Y Ave, NYC, NY"),
    ];
    let mut session = session_with("raw", raw_table(&records)?);

    let err = normalize(&mut session).unwrap_err();
    match err {
        PipelineError::StrictCast { column, data_type, .. } => {
            assert_eq!(column, "Quantity Ordered");
            assert_eq!(data_type, DataType::Int32);
        }
        other => panic!("expected a strict cast error, got {other}"),
    }
    assert!(!session.contains("sales"));
    Ok(())
}

#[test]
fn test_padded_numbers_are_accepted() -> Result<()> {
    let records = [
        RawSalesRecord::new(" 1", "A", " 2", "10.0", "2023-01-15", "1 X St, Boston, MA"),
        RawSalesRecord::new("2 ", "B", "3.0", " 5.0", "2023-02-20", "2 Y Ave, NYC, NY"),
    ];
    let mut session = session_with("raw", raw_table(&records)?);

    assert_eq!(normalize(&mut session)?, 2);
    let batch = session.scan("sales")?.concat()?;
    let order_ids = batch.column(0).as_primitive::<Int32Type>();
    let quantities = batch.column(2).as_primitive::<Int32Type>();
    assert_eq!(order_ids.values().to_vec(), vec![1, 2]);
    assert_eq!(quantities.values().to_vec(), vec![2, 3]);
    assert_eq!(batch.column(0).null_count(), 0);
    Ok(())
}

#[test]
fn test_null_quantity_is_not_a_failure() -> Result<()> {
    let mut record = RawSalesRecord::new("1", "A", "2", "10.0", "2023-01-15", "1 X St, Boston, MA");
    record.quantity_ordered = None;
    let mut session = session_with("raw", raw_table(&[record])?);

    assert_eq!(normalize(&mut session)?, 1);
    assert!(session.scan("sales")?.concat()?.column(2).is_null(0));
    Ok(())
}

#[test]
fn test_normalizing_twice_is_identical() -> Result<()> {
    let records = [
        RawSalesRecord::new("1", "A", "2", "10.0", "2023-01-15", "1 X St, Boston, MA"),
        RawSalesRecord::new("x", "B", "1", "abc", "not a date", "2 Y Ave, NYC, NY"),
    ];
    let mut session = session_with("raw", raw_table(&records)?);

    normalize(&mut session)?;
    let first = session.scan("sales")?.concat()?;
    normalize(&mut session)?;
    let second = session.scan("sales")?.concat()?;

    assert_eq!(first, second);
    assert_eq!(session.catalog().len(), 2);
    Ok(())
}

#[test]
fn test_describe_reports_sql_types() -> Result<()> {
    let records = [RawSalesRecord::new("1", "A", "2", "10.0", "2023-01-15", "1 X St, Boston, MA")];
    let mut session = session_with("raw", raw_table(&records)?);
    normalize(&mut session)?;

    let columns: Vec<(String, String)> = session
        .describe("SALES")?
        .into_iter()
        .map(|column| (column.column_name, column.column_type))
        .collect();
    let expected = [
        ("order_id", "INTEGER"),
        ("product", "VARCHAR"),
        ("quantity", "INTEGER"),
        ("price", "DECIMAL(18,3)"),
        ("order_date", "DATE"),
        ("purchase_address", "VARCHAR"),
    ];
    assert_eq!(columns.len(), expected.len());
    for ((name, data_type), (expected_name, expected_type)) in columns.iter().zip(expected) {
        assert_eq!(name, expected_name);
        assert_eq!(data_type, expected_type);
    }
    Ok(())
}

#[test]
fn test_lenient_dates_accept_us_timestamps() -> Result<()> {
    let records = [RawSalesRecord::new("1", "A", "2", "10.0", "04/19/19 08:46", "1 X St, Dallas, TX")];
    let mut session = session_with("raw", raw_table(&records)?);

    normalize(&mut session)?;
    assert!(session.scan("sales")?.concat()?.column(4).is_null(0));

    normalize_into(
        &mut session,
        "raw",
        "sales",
        &NormalizationPlan::sales(),
        &DateFormatConfig::lenient(),
    )?;
    let batch = session.scan("sales")?.concat()?;
    assert_eq!(
        batch.column(4).as_primitive::<Date32Type>().value_as_date(0),
        chrono::NaiveDate::from_ymd_opt(2019, 4, 19)
    );
    Ok(())
}
